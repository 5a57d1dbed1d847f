//! tinta - from-scratch PDF parsing and text extraction.

pub mod api;
pub mod codec;
pub mod document;
pub mod error;
pub mod font;
pub mod interp;
pub mod model;
pub mod parser;

pub use api::high_level;
pub use api::high_level::{extract_text, parse_document, parse_document_bytes};
pub use document::catalog::PDFDocument;
pub use error::{PdfError, Result};
pub use model::objects::{PDFObjRef, PDFObject, PDFStream};
