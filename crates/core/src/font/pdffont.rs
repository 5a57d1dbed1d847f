//! Font encoding resolution.
//!
//! Turns a font dictionary into a code -> Unicode table by combining the
//! base encoding, /Differences overrides and ToUnicode CMaps. Results are
//! cached per font object number for the document's lifetime.

use super::cmap::parse_tounicode;
use super::encoding::{DiffEntry, Encoding, EncodingDB};
use crate::document::catalog::PDFDocument;
use crate::error::{PdfError, Result};
use crate::model::objects::PDFObject;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Resolve a font dictionary (or reference to one) to its encoding,
/// cached by object number when the input is a reference.
pub fn resolve_font_encoding(doc: &PDFDocument, font: &PDFObject) -> Result<Arc<Encoding>> {
    let objid = match font {
        PDFObject::Ref(r) => Some(r.objid),
        _ => None,
    };

    if let Some(objid) = objid
        && let Ok(cache) = doc.font_encoding_cache.lock()
        && let Some(cached) = cache.get(&objid)
    {
        return Ok(Arc::clone(cached));
    }

    let resolved = doc.resolve(font)?;
    let font_dict = resolved.as_dict()?;
    let encoding = Arc::new(parse_font_dict(doc, font_dict)?);

    if let Some(objid) = objid
        && let Ok(mut cache) = doc.font_encoding_cache.lock()
    {
        cache.insert(objid, Arc::clone(&encoding));
    }

    Ok(encoding)
}

/// Dispatch on the font's /Subtype.
fn parse_font_dict(doc: &PDFDocument, font: &HashMap<String, PDFObject>) -> Result<Encoding> {
    let subtype_obj = font
        .get("Subtype")
        .ok_or_else(|| PdfError::KeyError("Subtype".to_string()))?;
    let subtype = doc.resolve(subtype_obj)?;
    match subtype.as_name()? {
        "Type0" => parse_type0_font(doc, font),
        "Type1" | "Type3" | "MMType1" => parse_simple_font(doc, font, false),
        "TrueType" => parse_simple_font(doc, font, true),
        other => Err(PdfError::SyntaxError(format!(
            "unsupported font subtype: /{}",
            other
        ))),
    }
}

/// Composite fonts: prefer a predefined named encoding, fall back to the
/// embedded /ToUnicode CMap.
fn parse_type0_font(doc: &PDFDocument, font: &HashMap<String, PDFObject>) -> Result<Encoding> {
    if let Some(encoding_obj) = font.get("Encoding") {
        let encoding = doc.resolve(encoding_obj)?;
        if let Ok(name) = encoding.as_name()
            && let Some(table) = EncodingDB::by_name(name)
        {
            return Ok(table);
        }
    }

    match font.get("ToUnicode") {
        Some(tounicode) => {
            let mut data = Vec::new();
            for chunk in doc.get_stream(tounicode)? {
                data.extend(chunk?);
            }
            parse_tounicode(&data)
        }
        None => Err(PdfError::KeyError("ToUnicode".to_string())),
    }
}

/// Simple fonts (Type1, TrueType): /Encoding is a predefined name or a
/// dictionary with /BaseEncoding and /Differences.
fn parse_simple_font(
    doc: &PDFDocument,
    font: &HashMap<String, PDFObject>,
    truetype: bool,
) -> Result<Encoding> {
    let encoding_obj = match font.get("Encoding") {
        Some(obj) => doc.resolve(obj)?,
        None => return Ok(EncodingDB::standard()),
    };

    match &*encoding_obj {
        PDFObject::Name(name) => {
            // Unrecognized names yield an empty mapping
            Ok(EncodingDB::by_name(name).unwrap_or_default())
        }
        PDFObject::Dict(dict) => {
            let base = match dict.get("BaseEncoding") {
                Some(base_obj) => {
                    let base_name = doc.resolve(base_obj)?;
                    EncodingDB::by_name(base_name.as_name()?).unwrap_or_default()
                }
                None => EncodingDB::standard(),
            };

            match dict.get("Differences") {
                Some(_) if truetype => {
                    // TrueType fonts with a Differences-bearing encoding
                    // dictionary are unresolved; keep the base encoding.
                    warn!("TrueType font with /Differences encoding dict, using base encoding");
                    Ok(base)
                }
                Some(diff_obj) => {
                    let differences = parse_differences(doc, diff_obj)?;
                    Ok(EncodingDB::apply_differences(&base, &differences))
                }
                None => Ok(base),
            }
        }
        other => Err(PdfError::TypeError {
            expected: "name or dict",
            got: other.type_name(),
        }),
    }
}

/// Collect the entries of a /Differences array.
fn parse_differences(doc: &PDFDocument, diff_obj: &PDFObject) -> Result<Vec<DiffEntry>> {
    let resolved = doc.resolve(diff_obj)?;
    let arr = resolved.as_array()?;

    let mut entries = Vec::with_capacity(arr.len());
    for item in arr {
        match item {
            PDFObject::Int(n) if (0..=255).contains(n) => {
                entries.push(DiffEntry::Code(*n as u8));
            }
            PDFObject::Int(n) => {
                warn!(code = n, "Differences code out of byte range");
            }
            PDFObject::Name(name) => {
                entries.push(DiffEntry::Name(name.clone()));
            }
            other => {
                return Err(PdfError::TypeError {
                    expected: "number or name",
                    got: other.type_name(),
                });
            }
        }
    }
    Ok(entries)
}
