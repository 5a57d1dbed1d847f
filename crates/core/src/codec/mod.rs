//! Codec modules for stream encryption and compression.
//!
//! - `arcfour`: RC4 stream cipher used by the standard security handler
//! - `flate`: zlib/deflate decompression with corrupted-stream salvage

pub mod arcfour;
pub mod flate;

pub use arcfour::Arcfour;
pub use flate::{Inflater, flate_decode};
