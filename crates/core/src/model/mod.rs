//! PDF model types.
//!
//! - `objects` - the PDF object domain (PDFObject, PDFStream, PDFObjRef)

pub mod objects;

pub use objects::{PDFObjRef, PDFObject, PDFStream};
