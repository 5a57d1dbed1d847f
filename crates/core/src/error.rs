//! Error types for the tinta PDF parsing library.

use thiserror::Error;

/// Primary error type for PDF parsing operations.
#[derive(Error, Debug)]
pub enum PdfError {
    #[error("invalid token at position {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("PDF syntax error: {0}")]
    SyntaxError(String),

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("key not found: {0}")]
    KeyError(String),

    #[error("no valid xref table found")]
    NoValidXRef,

    #[error("PDF object not found: {0}")]
    ObjectNotFound(u32),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("encryption error: {0}")]
    EncryptionError(String),

    #[error("unknown glyph name: {0}")]
    UnknownGlyph(String),

    #[error("invalid unicode codepoint: {0:#x}")]
    InvalidUnicode(u32),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias for PdfError.
pub type Result<T> = std::result::Result<T, PdfError>;
