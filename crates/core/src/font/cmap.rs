//! ToUnicode CMap parsing.
//!
//! A sibling of the content-stream interpreter that scans a decoded CMap
//! stream for `beginbfchar`/`endbfchar` and `beginbfrange`/`endbfrange`
//! blocks, building a code -> Unicode table.

use super::encoding::Encoding;
use crate::error::{PdfError, Result};
use crate::parser::lexer::{Keyword, Lexer, Token};
use tracing::warn;

/// Parse a decoded ToUnicode CMap stream into an encoding table.
///
/// Operands accumulate on a stack; every keyword consumes the stack and
/// clears it. Only the bf mapping operators produce entries - the CMap
/// header and codespace operators are recognized shapes that carry no
/// text mapping.
pub fn parse_tounicode(data: &[u8]) -> Result<Encoding> {
    let mut encoding = Encoding::new();
    let mut stack: Vec<Token> = Vec::new();
    let mut lexer = Lexer::new(data);

    while let Some(item) = lexer.next_token() {
        let (pos, token) = item?;
        match token {
            Token::Keyword(Keyword::EndBfChar) => {
                apply_bfchar(&stack, &mut encoding);
                stack.clear();
            }
            Token::Keyword(Keyword::EndBfRange) => {
                apply_bfrange(&stack, &mut encoding)?;
                stack.clear();
            }
            Token::Keyword(Keyword::ArrayStart) | Token::Keyword(Keyword::ArrayEnd) => {
                // Array markers are operands for endbfrange
                stack.push(token);
            }
            Token::Keyword(kw) => {
                if let Keyword::Unknown(bytes) = &kw {
                    warn!(
                        pos,
                        keyword = %String::from_utf8_lossy(bytes),
                        "unknown CMap keyword"
                    );
                }
                stack.clear();
            }
            other => stack.push(other),
        }
    }

    Ok(encoding)
}

/// Process (source-code, destination-string) pairs, two cells at a time.
fn apply_bfchar(stack: &[Token], encoding: &mut Encoding) {
    for pair in stack.chunks(2) {
        match pair {
            [Token::String(src), Token::String(dst)] => {
                encoding.insert(code_from_bytes(src), decode_utf16be(dst));
            }
            other => {
                warn!(?other, "malformed bfchar pair");
            }
        }
    }
}

/// Process (low-code, high-code, destination) triples.
///
/// The destination is either an array of strings applied sequentially
/// from low-code, or a single string whose last UTF-16 code unit is
/// incremented per code over [low, high).
fn apply_bfrange(stack: &[Token], encoding: &mut Encoding) -> Result<()> {
    let mut i = 0;
    while i < stack.len() {
        let (low, high) = match (&stack[i], stack.get(i + 1)) {
            (Token::String(low), Some(Token::String(high))) => {
                (code_from_bytes(low), code_from_bytes(high))
            }
            _ => {
                warn!("malformed bfrange bounds");
                return Ok(());
            }
        };

        match stack.get(i + 2) {
            Some(Token::Keyword(Keyword::ArrayStart)) => {
                // Collect destination strings up to the closing marker
                let mut j = i + 3;
                let mut code = low;
                while let Some(token) = stack.get(j) {
                    match token {
                        Token::Keyword(Keyword::ArrayEnd) => break,
                        Token::String(dst) => {
                            encoding.insert(code, decode_utf16be(dst));
                            code += 1;
                        }
                        other => {
                            warn!(?other, "non-string in bfrange array");
                        }
                    }
                    j += 1;
                }
                i = j + 1;
            }
            Some(Token::String(dst)) => {
                let mut units = utf16be_units(dst);
                for code in low..high {
                    encoding.insert(code, units_to_string(&units));
                    if let Some(last) = units.last_mut() {
                        *last = last.wrapping_add(1);
                    }
                }
                i += 3;
            }
            other => {
                return Err(PdfError::TypeError {
                    expected: "string or array",
                    got: match other {
                        Some(Token::Int(_)) | Some(Token::Real(_)) => "number",
                        Some(Token::Name(_)) => "name",
                        _ => "nothing",
                    },
                });
            }
        }
    }
    Ok(())
}

/// Interpret string bytes as a big-endian integer code.
fn code_from_bytes(bytes: &[u8]) -> u32 {
    let mut code = 0u32;
    for &b in bytes.iter().take(4) {
        code = (code << 8) | (b as u32);
    }
    code
}

fn utf16be_units(bytes: &[u8]) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
        .collect()
}

fn units_to_string(units: &[u16]) -> String {
    char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or('\u{fffd}'))
        .collect()
}

/// Decode UTF-16BE bytes to a string.
fn decode_utf16be(bytes: &[u8]) -> String {
    units_to_string(&utf16be_units(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bfchar_pairs() {
        let data = b"2 beginbfchar\n<01> <0041>\n<02> <0042>\nendbfchar\n";
        let enc = parse_tounicode(data).unwrap();
        assert_eq!(enc.get(&1).map(String::as_str), Some("A"));
        assert_eq!(enc.get(&2).map(String::as_str), Some("B"));
    }

    #[test]
    fn test_bfchar_multichar_destination() {
        let data = b"1 beginbfchar <03> <00660069> endbfchar";
        let enc = parse_tounicode(data).unwrap();
        assert_eq!(enc.get(&3).map(String::as_str), Some("fi"));
    }

    #[test]
    fn test_bfrange_string_destination() {
        // Five consecutive codes map to five consecutive scalars
        let data = b"1 beginbfrange <20> <25> <0041> endbfrange";
        let enc = parse_tounicode(data).unwrap();
        assert_eq!(enc.len(), 5);
        assert_eq!(enc.get(&0x20).map(String::as_str), Some("A"));
        assert_eq!(enc.get(&0x24).map(String::as_str), Some("E"));
        assert!(!enc.contains_key(&0x25));
    }

    #[test]
    fn test_bfrange_array_destination() {
        let data = b"1 beginbfrange <05> <07> [<0058> <0059> <005A>] endbfrange";
        let enc = parse_tounicode(data).unwrap();
        assert_eq!(enc.get(&5).map(String::as_str), Some("X"));
        assert_eq!(enc.get(&6).map(String::as_str), Some("Y"));
        assert_eq!(enc.get(&7).map(String::as_str), Some("Z"));
    }

    #[test]
    fn test_bfrange_bad_destination_fails() {
        let data = b"1 beginbfrange <01> <02> /Bogus endbfrange";
        assert!(matches!(
            parse_tounicode(data),
            Err(PdfError::TypeError { .. })
        ));
    }

    #[test]
    fn test_header_operators_ignored() {
        let data = b"/CIDInit /ProcSet findresource begin\n\
            12 dict begin\nbegincmap\n\
            1 begincodespacerange <00> <FF> endcodespacerange\n\
            1 beginbfchar <41> <0041> endbfchar\n\
            endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend";
        let enc = parse_tounicode(data).unwrap();
        assert_eq!(enc.len(), 1);
        assert_eq!(enc.get(&0x41).map(String::as_str), Some("A"));
    }
}
