//! Public high-level API.

pub mod high_level;

pub use high_level::{TextFragments, extract_text, parse_document, parse_document_bytes};
