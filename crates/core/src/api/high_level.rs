//! High-level text extraction.
//!
//! Walks the page tree, resolves each page's font encodings, interprets
//! its content streams and reassembles Unicode text fragments.

use crate::document::catalog::PDFDocument;
use crate::error::Result;
use crate::font::encoding::{Encoding, EncodingDB};
use crate::font::pdffont::resolve_font_encoding;
use crate::interp::interpreter::ContentParser;
use crate::interp::ops::Operation;
use crate::model::objects::PDFObject;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parse a document from raw bytes.
pub fn parse_document<D: AsRef<[u8]>>(data: D, password: &str) -> Result<PDFDocument> {
    PDFDocument::new(data, password)
}

/// Parse a document from shared bytes (zero-copy).
pub fn parse_document_bytes(data: Bytes, password: &str) -> Result<PDFDocument> {
    PDFDocument::from_bytes(data, password)
}

/// Extract text fragments from every page of the document.
///
/// Returns a lazy iterator: pages are visited and interpreted as the
/// caller pulls. Pages with localized corruption are skipped with a
/// warning; they contribute nothing.
pub fn extract_text(doc: &PDFDocument) -> Result<TextFragments<'_>> {
    let root = doc.deref_object(&doc.root())?;
    let root_dict = root.as_dict()?;

    let pages = doc.get_object(
        root_dict
            .get("Pages")
            .ok_or_else(|| crate::error::PdfError::KeyError("Pages".to_string()))?,
    )?;
    let kids = match pages.as_dict()?.get("Kids") {
        Some(kids_obj) => doc.get_object(kids_obj)?.as_array()?.clone(),
        None => Vec::new(),
    };

    Ok(TextFragments {
        doc,
        queue: VecDeque::from(kids),
        pending: VecDeque::new(),
    })
}

/// Lazy sequence of text fragments, one per text-showing operation.
pub struct TextFragments<'doc> {
    doc: &'doc PDFDocument,
    /// Page-tree nodes waiting to be visited; a subtree's kids are
    /// processed before siblings already queued
    queue: VecDeque<PDFObject>,
    /// Fragments produced by the current page
    pending: VecDeque<String>,
}

impl TextFragments<'_> {
    /// Visit one page-tree node: leaves fill `pending`, intermediate
    /// nodes push their kids to the front of the queue.
    fn visit(&mut self, node: PDFObject) {
        let node_obj = match self.doc.get_object(&node) {
            Ok(obj) => obj,
            Err(e) => {
                warn!(error = %e, "skipping unreadable page-tree node");
                return;
            }
        };
        let dict = match node_obj.as_dict() {
            Ok(d) => d,
            Err(e) => {
                warn!(error = %e, "page-tree node is not a dictionary");
                return;
            }
        };

        match dict.get("Contents") {
            Some(contents) => {
                if let Err(e) = self.visit_page(dict, contents) {
                    warn!(error = %e, "skipping page");
                }
            }
            None => {
                let kids = dict
                    .get("Kids")
                    .and_then(|k| self.doc.get_object(k).ok())
                    .and_then(|k| k.as_array().ok().cloned())
                    .unwrap_or_default();
                for kid in kids.into_iter().rev() {
                    self.queue.push_front(kid);
                }
            }
        }
    }

    /// Interpret one leaf page's content stream.
    fn visit_page(
        &mut self,
        page: &HashMap<String, PDFObject>,
        contents: &PDFObject,
    ) -> Result<()> {
        let fonts = self.page_fonts(page);
        let data = self.page_content(contents)?;

        let standard: Arc<Encoding> = Arc::new(EncodingDB::standard());
        let mut encoding = Arc::clone(&standard);

        for operation in ContentParser::new(&data) {
            match operation {
                Operation::SetFont { name, .. } => {
                    encoding = match fonts.get(&name) {
                        Some(font_encoding) => Arc::clone(font_encoding),
                        None => {
                            warn!(font = %name, "font not in page resources");
                            Arc::clone(&standard)
                        }
                    };
                }
                Operation::ShowText(bytes) => {
                    let text: String = bytes
                        .iter()
                        .map(|code| {
                            encoding
                                .get(&(*code as u32))
                                .map(String::as_str)
                                .unwrap_or("\u{fffd}")
                        })
                        .collect();
                    self.pending.push_back(text);
                }
                other => {
                    debug!(?other, "ignored for text extraction");
                }
            }
        }

        Ok(())
    }

    /// Resolve the page's /Resources/Font entries to encodings.
    fn page_fonts(&self, page: &HashMap<String, PDFObject>) -> HashMap<String, Arc<Encoding>> {
        let mut fonts = HashMap::new();

        let resources = match page
            .get("Resources")
            .and_then(|r| self.doc.get_object(r).ok())
        {
            Some(r) => r,
            None => return fonts,
        };
        let font_dict = match resources
            .as_dict()
            .ok()
            .and_then(|r| r.get("Font"))
            .and_then(|f| self.doc.get_object(f).ok())
        {
            Some(f) => f,
            None => return fonts,
        };
        let font_dict = match font_dict.as_dict() {
            Ok(d) => d,
            Err(_) => return fonts,
        };

        for (name, font) in font_dict {
            match resolve_font_encoding(self.doc, font) {
                Ok(encoding) => {
                    fonts.insert(name.clone(), encoding);
                }
                Err(e) => {
                    warn!(font = %name, error = %e, "failed to resolve font encoding");
                }
            }
        }
        fonts
    }

    /// Decode the page's content: a single stream or an array of streams
    /// concatenated in order.
    fn page_content(&self, contents: &PDFObject) -> Result<Vec<u8>> {
        let resolved = self.doc.get_object(contents)?;
        match resolved {
            PDFObject::Array(parts) => {
                let mut data = Vec::new();
                for part in &parts {
                    for chunk in self.doc.get_stream(part)? {
                        data.extend(chunk?);
                    }
                    data.push(b'\n');
                }
                Ok(data)
            }
            _ => {
                let mut data = Vec::new();
                for chunk in self.doc.get_stream(contents)? {
                    data.extend(chunk?);
                }
                Ok(data)
            }
        }
    }
}

impl Iterator for TextFragments<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(text) = self.pending.pop_front() {
                return Some(text);
            }
            let node = self.queue.pop_front()?;
            self.visit(node);
        }
    }
}

impl PDFDocument {
    /// Extract text fragments from every page.
    pub fn extract_text(&self) -> Result<TextFragments<'_>> {
        extract_text(self)
    }
}
