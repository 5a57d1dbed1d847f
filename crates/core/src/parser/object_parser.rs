//! PDF object parser.
//!
//! Consumes one token sequence and builds exactly one `PDFObject`, leaving
//! the cursor positioned after it. The same parser serves file-level
//! objects and the trailer dictionary.

use crate::error::{PdfError, Result};
use crate::model::objects::{PDFObjRef, PDFObject};
use crate::parser::lexer::{Keyword, Lexer, Token};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
enum FrameKind {
    Array,
    Dict,
}

/// An in-progress container: an open array or dictionary and the items
/// collected for it so far.
struct Frame {
    kind: FrameKind,
    items: Vec<PDFObject>,
}

/// Parser building `PDFObject` values from a token stream.
pub struct ObjectParser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> ObjectParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(data),
        }
    }

    /// Current position in the data.
    pub fn tell(&self) -> usize {
        self.lexer.tell()
    }

    /// Set current position in the data.
    pub fn set_pos(&mut self, pos: usize) {
        self.lexer.set_pos(pos);
    }

    /// Get the data after the current position.
    pub fn remaining(&self) -> &'a [u8] {
        self.lexer.remaining()
    }

    fn next_token(&mut self) -> Result<(usize, Token)> {
        self.lexer.next_token().ok_or(PdfError::UnexpectedEof)?
    }

    /// Parse exactly one object.
    pub fn parse_object(&mut self) -> Result<PDFObject> {
        let mut frames: Vec<Frame> = Vec::new();

        loop {
            let (pos, token) = self.next_token()?;

            let value = match token {
                Token::Keyword(Keyword::DictStart) => {
                    frames.push(Frame {
                        kind: FrameKind::Dict,
                        items: Vec::new(),
                    });
                    continue;
                }
                Token::Keyword(Keyword::ArrayStart) => {
                    frames.push(Frame {
                        kind: FrameKind::Array,
                        items: Vec::new(),
                    });
                    continue;
                }
                Token::Keyword(Keyword::DictEnd) => {
                    let frame = Self::pop_frame(&mut frames, FrameKind::Dict, pos)?;
                    PDFObject::Dict(Self::group_dict(frame.items)?)
                }
                Token::Keyword(Keyword::ArrayEnd) => {
                    let frame = Self::pop_frame(&mut frames, FrameKind::Array, pos)?;
                    PDFObject::Array(frame.items)
                }
                Token::Keyword(Keyword::Null) => PDFObject::Null,
                Token::Keyword(Keyword::R) => {
                    let items = match frames.last_mut() {
                        Some(frame) => &mut frame.items,
                        None => {
                            return Err(PdfError::SyntaxError(format!(
                                "R without preceding object numbers at {}",
                                pos
                            )));
                        }
                    };
                    Self::make_ref(items, pos)?
                }
                Token::Keyword(other) => {
                    return Err(PdfError::SyntaxError(format!(
                        "unexpected keyword {:?} at {}",
                        String::from_utf8_lossy(other.as_bytes()),
                        pos
                    )));
                }
                Token::Int(n) => {
                    // "n g R" forms an indirect reference; look ahead for it
                    // only outside containers, where the stack rule below
                    // cannot apply.
                    if frames.is_empty() {
                        return Ok(self.try_parse_ref(n));
                    }
                    PDFObject::Int(n)
                }
                Token::Real(n) => PDFObject::Real(n),
                Token::Bool(b) => PDFObject::Bool(b),
                Token::Name(name) => PDFObject::Name(name),
                Token::String(bytes) => PDFObject::String(bytes),
            };

            match frames.last_mut() {
                Some(frame) => frame.items.push(value),
                None => return Ok(value),
            }
        }
    }

    /// After a bare integer at top level, check for `<gen> R`.
    fn try_parse_ref(&mut self, objid: i64) -> PDFObject {
        let save = self.lexer.tell();
        if let Some(Ok((_, Token::Int(genno)))) = self.lexer.next_token()
            && let Some(Ok((_, Token::Keyword(Keyword::R)))) = self.lexer.next_token()
            && objid >= 0
            && genno >= 0
        {
            return PDFObject::Ref(PDFObjRef::new(objid as u32, genno as u32));
        }
        self.lexer.set_pos(save);
        PDFObject::Int(objid)
    }

    /// `R` pops generation then object number from the current frame.
    fn make_ref(items: &mut Vec<PDFObject>, pos: usize) -> Result<PDFObject> {
        if items.len() < 2 {
            return Err(PdfError::SyntaxError(format!(
                "R without two preceding numbers at {}",
                pos
            )));
        }
        let genno = items.pop().expect("length checked");
        let objid = items.pop().expect("length checked");
        match (&objid, &genno) {
            (PDFObject::Int(o), PDFObject::Int(g)) if *o >= 0 && *g >= 0 => {
                Ok(PDFObject::Ref(PDFObjRef::new(*o as u32, *g as u32)))
            }
            (PDFObject::Int(_), other) | (other, _) => Err(PdfError::TypeError {
                expected: "int",
                got: other.type_name(),
            }),
        }
    }

    fn pop_frame(frames: &mut Vec<Frame>, kind: FrameKind, pos: usize) -> Result<Frame> {
        match frames.pop() {
            Some(frame) if frame.kind == kind => Ok(frame),
            _ => Err(PdfError::SyntaxError(format!(
                "mismatched container close at {}",
                pos
            ))),
        }
    }

    /// Group collected dictionary items pairwise into (key, value) entries.
    fn group_dict(items: Vec<PDFObject>) -> Result<HashMap<String, PDFObject>> {
        let mut dict = HashMap::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let Some(key) = iter.next() {
            let name = match key {
                PDFObject::Name(name) => name,
                other => {
                    return Err(PdfError::TypeError {
                        expected: "name",
                        got: other.type_name(),
                    });
                }
            };
            if let Some(value) = iter.next() {
                dict.insert(name, value);
            }
        }
        Ok(dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &[u8]) -> PDFObject {
        ObjectParser::new(data).parse_object().unwrap()
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse(b"42"), PDFObject::Int(42));
        assert_eq!(parse(b"-1.5"), PDFObject::Real(-1.5));
        assert_eq!(parse(b"true"), PDFObject::Bool(true));
        assert!(parse(b"null").is_null());
        assert_eq!(parse(b"/Name"), PDFObject::Name("Name".to_string()));
    }

    #[test]
    fn test_parse_top_level_ref() {
        let obj = parse(b"10 0 R");
        let r = obj.as_ref().unwrap();
        assert_eq!(r.objid, 10);
        assert_eq!(r.genno, 0);
    }

    #[test]
    fn test_bare_int_not_a_ref() {
        let mut parser = ObjectParser::new(b"10 /Next");
        assert_eq!(parser.parse_object().unwrap(), PDFObject::Int(10));
        assert_eq!(
            parser.parse_object().unwrap(),
            PDFObject::Name("Next".to_string())
        );
    }

    #[test]
    fn test_parse_array_with_refs() {
        let obj = parse(b"[ 1 0 R 2 0 R 3 ]");
        let arr = obj.as_array().unwrap();
        assert_eq!(arr.len(), 3);
        assert_eq!(arr[0].as_ref().unwrap().objid, 1);
        assert_eq!(arr[1].as_ref().unwrap().objid, 2);
        assert_eq!(arr[2].as_int().unwrap(), 3);
    }

    #[test]
    fn test_parse_nested_dict() {
        let obj = parse(b"<< /Resources << /Font << /F1 1 0 R >> >> >>");
        let dict = obj.as_dict().unwrap();
        let resources = dict.get("Resources").unwrap().as_dict().unwrap();
        let font = resources.get("Font").unwrap().as_dict().unwrap();
        assert_eq!(font.get("F1").unwrap().as_ref().unwrap().objid, 1);
    }

    #[test]
    fn test_dict_key_must_be_name() {
        let result = ObjectParser::new(b"<< 1 2 >>").parse_object();
        assert!(matches!(
            result,
            Err(PdfError::TypeError {
                expected: "name",
                ..
            })
        ));
    }

    #[test]
    fn test_ref_needs_two_numbers() {
        let result = ObjectParser::new(b"[ 1 R ]").parse_object();
        assert!(result.is_err());
    }

    #[test]
    fn test_unexpected_keyword_fails() {
        let result = ObjectParser::new(b"frobnicate").parse_object();
        assert!(matches!(result, Err(PdfError::SyntaxError(_))));
    }

    #[test]
    fn test_cursor_after_object() {
        let mut parser = ObjectParser::new(b"<< /A 1 >> 7");
        parser.parse_object().unwrap();
        assert_eq!(parser.parse_object().unwrap(), PDFObject::Int(7));
    }
}
