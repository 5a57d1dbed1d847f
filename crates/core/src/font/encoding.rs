//! Encoding database: glyph names, predefined encodings, Differences.
//!
//! Follows the Adobe Glyph List naming convention for glyph name to
//! Unicode conversion.

use super::latin_enc::ENCODING;
use crate::error::{PdfError, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// A code -> Unicode mapping. A single code may map to more than one
/// Unicode scalar (ligatures, CMap ranges), so the value is a string.
pub type Encoding = HashMap<u32, String>;

/// Glyph list data embedded at compile time
const GLYPHLIST_DATA: &str = include_str!("glyphlist.txt");

/// Lazily initialized glyph name to Unicode character map
static GLYPH_TO_CHAR: LazyLock<HashMap<&'static str, char>> = LazyLock::new(|| {
    let mut map = HashMap::with_capacity(256);
    for line in GLYPHLIST_DATA.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((name, hex)) = line.split_once(';')
            && let Ok(code) = u32::from_str_radix(hex.trim(), 16)
            && let Some(ch) = char::from_u32(code)
        {
            map.insert(name, ch);
        }
    }
    map
});

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

fn is_surrogate(cp: u32) -> bool {
    (0xD800..=0xDFFF).contains(&cp)
}

/// Decode a single component of a glyph name.
fn decode_component(name: &str) -> Result<String> {
    // "uni" + 4*N hex digits -> UTF-16 code units
    if name.starts_with("uni") && name.len() >= 7 {
        let hex = &name[3..];
        if hex.len() % 4 == 0 && is_hex(hex) {
            let mut result = String::new();
            for chunk in hex.as_bytes().chunks(4) {
                let hex_str = std::str::from_utf8(chunk).expect("hex checked");
                let cp = u32::from_str_radix(hex_str, 16)
                    .map_err(|_| PdfError::UnknownGlyph(name.to_string()))?;
                if is_surrogate(cp) {
                    return Err(PdfError::UnknownGlyph(name.to_string()));
                }
                let ch = char::from_u32(cp).ok_or(PdfError::InvalidUnicode(cp))?;
                result.push(ch);
            }
            return Ok(result);
        }
    }

    // "u" + 4-6 hex digits -> single code point
    if name.starts_with('u') && !name.starts_with("uni") {
        let hex = &name[1..];
        if (4..=6).contains(&hex.len()) && is_hex(hex) {
            let cp = u32::from_str_radix(hex, 16)
                .map_err(|_| PdfError::UnknownGlyph(name.to_string()))?;
            if cp > 0x10FFFF || is_surrogate(cp) {
                return Err(PdfError::InvalidUnicode(cp));
            }
            let ch = char::from_u32(cp).ok_or(PdfError::InvalidUnicode(cp))?;
            return Ok(ch.to_string());
        }
    }

    if let Some(&ch) = GLYPH_TO_CHAR.get(name) {
        return Ok(ch.to_string());
    }

    Err(PdfError::UnknownGlyph(name.to_string()))
}

/// Convert a glyph name to a Unicode string.
///
/// 1. Strip any suffix after "."
/// 2. Split by "_" for composite glyphs
/// 3. Decode each component: "uniXXXX" forms, "uXXXX[XX]" forms, then
///    glyph list lookup
pub fn name2unicode(name: &str) -> Result<String> {
    let name = match name.find('.') {
        Some(idx) => &name[..idx],
        None => name,
    };

    if name.is_empty() || name == "notdef" {
        return Err(PdfError::UnknownGlyph(name.to_string()));
    }

    let mut result = String::new();
    for part in name.split('_') {
        result.push_str(&decode_component(part)?);
    }
    Ok(result)
}

/// Entry in a /Differences array.
#[derive(Debug, Clone)]
pub enum DiffEntry {
    /// A code position: sets the current code cursor
    Code(u8),
    /// A glyph name assigned at the cursor, advancing it by one
    Name(String),
}

/// Predefined PDF encoding database.
pub struct EncodingDB;

impl EncodingDB {
    /// Look up one of the predefined named encodings.
    ///
    /// Returns None for names outside the predefined table, letting the
    /// caller pick its subtype-specific fallback.
    pub fn by_name(name: &str) -> Option<Encoding> {
        let col = match name {
            "StandardEncoding" => 0,
            "MacRomanEncoding" => 1,
            "WinAnsiEncoding" => 2,
            "PDFDocEncoding" => 3,
            _ => return None,
        };
        Some(Self::build(col))
    }

    /// The default standard encoding.
    pub fn standard() -> Encoding {
        Self::build(0)
    }

    fn build(col: usize) -> Encoding {
        let mut encoding = Encoding::with_capacity(256);
        for &(glyph_name, std, mac, win, pdf) in ENCODING {
            let code = match col {
                0 => std,
                1 => mac,
                2 => win,
                _ => pdf,
            };
            if let Some(code) = code
                && let Ok(unicode) = name2unicode(glyph_name)
            {
                encoding.insert(code as u32, unicode);
            }
        }
        encoding
    }

    /// Apply a /Differences array over a base encoding.
    ///
    /// The array is scanned left to right: a Number entry sets the
    /// current code cursor, each Name entry assigns that code (the
    /// replacement character for unknown names) and advances the cursor.
    pub fn apply_differences(base: &Encoding, differences: &[DiffEntry]) -> Encoding {
        let mut encoding = base.clone();
        let mut current: Option<u8> = None;

        for entry in differences {
            match entry {
                DiffEntry::Code(code) => {
                    current = Some(*code);
                }
                DiffEntry::Name(glyph_name) => {
                    if let Some(code) = current {
                        let unicode = name2unicode(glyph_name)
                            .unwrap_or_else(|_| "\u{fffd}".to_string());
                        encoding.insert(code as u32, unicode);
                        current = code.checked_add(1);
                    }
                    // A name with no preceding code is silently ignored
                }
            }
        }

        encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_list_loaded() {
        assert!(GLYPH_TO_CHAR.len() > 200);
        assert_eq!(GLYPH_TO_CHAR.get("A"), Some(&'A'));
        assert_eq!(GLYPH_TO_CHAR.get("eacute"), Some(&'é'));
    }

    #[test]
    fn test_name2unicode_forms() {
        assert_eq!(name2unicode("A").unwrap(), "A");
        assert_eq!(name2unicode("uni0041").unwrap(), "A");
        assert_eq!(name2unicode("uni00410042").unwrap(), "AB");
        assert_eq!(name2unicode("u0041").unwrap(), "A");
        assert_eq!(name2unicode("A.sc").unwrap(), "A");
        assert_eq!(name2unicode("f_i").unwrap(), "fi");
        assert!(name2unicode("nosuchglyph").is_err());
        assert!(name2unicode(".notdef").is_err());
    }

    #[test]
    fn test_standard_encoding_letters() {
        let enc = EncodingDB::standard();
        assert_eq!(enc.get(&65).map(String::as_str), Some("A"));
        assert_eq!(enc.get(&122).map(String::as_str), Some("z"));
        // fi ligature sits at 174 in StandardEncoding
        assert_eq!(enc.get(&174).map(String::as_str), Some("\u{fb01}"));
    }

    #[test]
    fn test_win_ansi_differs_from_standard() {
        let win = EncodingDB::by_name("WinAnsiEncoding").unwrap();
        assert_eq!(win.get(&233).map(String::as_str), Some("é"));
        assert!(EncodingDB::by_name("NoSuchEncoding").is_none());
    }

    #[test]
    fn test_differences_over_empty_base() {
        let base = Encoding::new();
        let diffs = vec![
            DiffEntry::Code(65),
            DiffEntry::Name("A".to_string()),
            DiffEntry::Name("B".to_string()),
        ];
        let enc = EncodingDB::apply_differences(&base, &diffs);
        assert_eq!(enc.get(&65).map(String::as_str), Some("A"));
        assert_eq!(enc.get(&66).map(String::as_str), Some("B"));
        assert_eq!(enc.len(), 2);
    }

    #[test]
    fn test_differences_cursor_reset() {
        let base = Encoding::new();
        let diffs = vec![
            DiffEntry::Code(65),
            DiffEntry::Name("A".to_string()),
            DiffEntry::Code(97),
            DiffEntry::Name("a".to_string()),
        ];
        let enc = EncodingDB::apply_differences(&base, &diffs);
        assert_eq!(enc.get(&65).map(String::as_str), Some("A"));
        assert_eq!(enc.get(&97).map(String::as_str), Some("a"));
    }

    #[test]
    fn test_differences_unknown_glyph_is_replacement() {
        let base = Encoding::new();
        let diffs = vec![
            DiffEntry::Code(1),
            DiffEntry::Name("nosuchglyph".to_string()),
        ];
        let enc = EncodingDB::apply_differences(&base, &diffs);
        assert_eq!(enc.get(&1).map(String::as_str), Some("\u{fffd}"));
    }
}
