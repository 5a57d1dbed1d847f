//! Font handling for text extraction.
//!
//! - `cmap` - ToUnicode CMap parsing
//! - `encoding` - glyph names, predefined encodings, Differences
//! - `latin_enc` - Latin character set table
//! - `pdffont` - font dictionary to encoding resolution

pub mod cmap;
pub mod encoding;
pub mod latin_enc;
pub mod pdffont;

pub use cmap::parse_tounicode;
pub use encoding::{DiffEntry, Encoding, EncodingDB, name2unicode};
pub use pdffont::resolve_font_encoding;
