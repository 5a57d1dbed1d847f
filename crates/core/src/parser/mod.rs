//! Tokenizing and object parsing.
//!
//! - `lexer`: byte-level tokenizer
//! - `object_parser`: recursive object parser over the token stream

pub mod lexer;
pub mod object_parser;

pub use lexer::{Keyword, Lexer, Token};
pub use object_parser::ObjectParser;
