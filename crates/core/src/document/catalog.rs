//! PDF Document - main entry point for PDF parsing.
//!
//! Handles:
//! - startxref discovery and xref table parsing
//! - incremental-update chains (/Prev) with newest-revision-wins merging
//! - lazy indirect object resolution with a permanent per-document cache
//! - stream decoding (decrypt, then inflate), chunk by chunk

use super::security::StandardSecurityHandler;
use crate::codec::flate::Inflater;
use crate::error::{PdfError, Result};
use crate::font::encoding::Encoding;
use crate::model::objects::{PDFObjRef, PDFObject, PDFStream};
use crate::parser::lexer::{Keyword, Lexer, Token};
use crate::parser::object_parser::ObjectParser;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Window size for chunked stream reads.
const CHUNK_SIZE: usize = 4096;

/// XRef entry - location of an object in the PDF file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct XRefEntry {
    /// Byte offset in the file
    pub offset: usize,
    /// Generation number
    #[allow(dead_code)]
    pub genno: u32,
    /// In-use ("n") vs free ("f") entry
    pub in_use: bool,
}

/// PDF Document - provides access to PDF objects and text content.
///
/// Owns the whole input as shared bytes; stream payloads are zero-copy
/// slices of it, so out-of-band reads never disturb a shared cursor.
pub struct PDFDocument {
    data: Bytes,
    /// Merged xref table over all revisions (newest wins)
    xref: HashMap<u32, XRefEntry>,
    /// Trailer dictionary of the newest revision
    trailer: HashMap<String, PDFObject>,
    /// Declared object count from the trailer
    size: i64,
    /// Catalog reference from the trailer
    root: PDFObjRef,
    /// Resolved objects, cached permanently per object number
    cache: Mutex<HashMap<u32, Arc<PDFObject>>>,
    /// Object numbers currently being resolved (cycle guard)
    resolving: Mutex<HashSet<u32>>,
    /// Per-font encoding tables, cached by font object number
    pub(crate) font_encoding_cache: Mutex<HashMap<u32, Arc<Encoding>>>,
    security_handler: Option<StandardSecurityHandler>,
}

impl PDFDocument {
    /// Create a new PDFDocument from raw PDF data.
    pub fn new<D: AsRef<[u8]>>(data: D, password: &str) -> Result<Self> {
        Self::from_bytes(Bytes::copy_from_slice(data.as_ref()), password)
    }

    /// Create a new PDFDocument from shared bytes (zero-copy).
    pub fn from_bytes(data: Bytes, password: &str) -> Result<Self> {
        let mut doc = Self {
            data,
            xref: HashMap::new(),
            trailer: HashMap::new(),
            size: 0,
            root: PDFObjRef::new(0, 0),
            cache: Mutex::new(HashMap::new()),
            resolving: Mutex::new(HashSet::new()),
            font_encoding_cache: Mutex::new(HashMap::new()),
            security_handler: None,
        };
        doc.parse(password)?;
        Ok(doc)
    }

    /// Returns the raw PDF bytes.
    pub fn bytes(&self) -> &[u8] {
        self.data.as_ref()
    }

    /// The trailer dictionary of the newest revision.
    pub fn trailer(&self) -> &HashMap<String, PDFObject> {
        &self.trailer
    }

    /// Declared /Size from the trailer.
    pub fn size(&self) -> i64 {
        self.size
    }

    /// The catalog (/Root) reference.
    pub fn root(&self) -> PDFObjRef {
        self.root
    }

    /// Whether the document carries an /Encrypt dictionary.
    pub fn is_encrypted(&self) -> bool {
        self.security_handler.is_some()
    }

    /// Parse the document structure: xref chain, trailer, encryption.
    fn parse(&mut self, password: &str) -> Result<()> {
        let startxref = Self::find_startxref(self.data.as_ref())?;

        let (mut table, trailer) = self.load_xref_at(startxref)?;

        // Follow /Prev chains: older revisions only fill in object numbers
        // absent from every newer table.
        let mut visited = HashSet::from([startxref]);
        let mut prev = trailer.get("Prev").and_then(|p| p.as_int().ok());
        while let Some(pos) = prev {
            let pos = pos as usize;
            if !visited.insert(pos) {
                warn!(offset = pos, "circular /Prev chain");
                break;
            }
            let (older, older_trailer) = self.load_xref_at(pos)?;
            for (objid, entry) in older {
                table.entry(objid).or_insert(entry);
            }
            prev = older_trailer.get("Prev").and_then(|p| p.as_int().ok());
        }

        self.xref = table;
        self.size = trailer
            .get("Size")
            .ok_or_else(|| PdfError::KeyError("Size".to_string()))?
            .as_int()?;
        self.root = *trailer
            .get("Root")
            .ok_or_else(|| PdfError::KeyError("Root".to_string()))?
            .as_ref()?;
        self.trailer = trailer;

        // Derive the encrypter before any stream is read.
        if let Some(encrypt) = self.trailer.get("Encrypt").cloned() {
            let encrypt_obj = self.resolve(&encrypt)?;
            let encrypt_dict = encrypt_obj.as_dict()?;

            let doc_id = match self.trailer.get("ID") {
                Some(id_obj) => match self.resolve(id_obj)?.as_array() {
                    Ok(arr) => arr
                        .iter()
                        .filter_map(|o| {
                            self.resolve(o)
                                .ok()
                                .and_then(|v| v.as_string().ok().map(|s| s.to_vec()))
                        })
                        .collect(),
                    Err(_) => vec![],
                },
                None => vec![],
            };

            let handler = StandardSecurityHandler::new(encrypt_dict, &doc_id, password)?;
            debug!("encryption key derived ({} bytes)", handler.encryption_key().len());
            self.security_handler = Some(handler);
        }

        Ok(())
    }

    /// Locate the starting xref offset by scanning backward from EOF.
    ///
    /// The last non-blank line must be `%%EOF`, preceded by the offset
    /// integer, preceded by `startxref`.
    fn find_startxref(data: &[u8]) -> Result<usize> {
        let mut lines = RLines::new(data);

        let eof = loop {
            match lines.next() {
                Some(line) if !trim(line).is_empty() => break line,
                Some(_) => continue,
                None => return Err(PdfError::NoValidXRef),
            }
        };
        if trim(eof) != b"%%EOF" {
            return Err(PdfError::NoValidXRef);
        }

        let offset_line = lines.next().ok_or(PdfError::NoValidXRef)?;
        let offset: usize = std::str::from_utf8(trim(offset_line))
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(PdfError::NoValidXRef)?;

        let keyword_line = lines.next().ok_or(PdfError::NoValidXRef)?;
        if trim(keyword_line) != b"startxref" {
            return Err(PdfError::NoValidXRef);
        }

        Ok(offset)
    }

    /// Load one xref table and its trailer dictionary at `pos`.
    fn load_xref_at(
        &self,
        pos: usize,
    ) -> Result<(HashMap<u32, XRefEntry>, HashMap<String, PDFObject>)> {
        let data = self.data.as_ref();
        if pos >= data.len() {
            return Err(PdfError::NoValidXRef);
        }

        let mut cursor = pos;
        if trim(read_line(data, &mut cursor)) != b"xref" {
            return Err(PdfError::NoValidXRef);
        }

        let mut table = HashMap::new();
        loop {
            if cursor >= data.len() {
                return Err(PdfError::NoValidXRef);
            }
            let line = trim(read_line(data, &mut cursor));
            if line == b"trailer" {
                break;
            }
            if line.is_empty() {
                continue;
            }

            // Subsection header: <first-object-number> <count>
            let mut fields = line.split(|b| *b == b' ').filter(|f| !f.is_empty());
            let first: u32 = parse_int(fields.next())
                .ok_or_else(|| PdfError::SyntaxError("bad xref subsection header".into()))?;
            let count: u32 = parse_int(fields.next())
                .ok_or_else(|| PdfError::SyntaxError("bad xref subsection header".into()))?;

            for i in 0..count {
                let entry_line = trim(read_line(data, &mut cursor));
                let mut fields = entry_line.split(|b| *b == b' ').filter(|f| !f.is_empty());
                let offset: usize = parse_int(fields.next())
                    .ok_or_else(|| PdfError::SyntaxError("bad xref entry".into()))?;
                let genno: u32 = parse_int(fields.next())
                    .ok_or_else(|| PdfError::SyntaxError("bad xref entry".into()))?;
                let in_use = match fields.next() {
                    Some(b"n") => true,
                    Some(b"f") => false,
                    _ => return Err(PdfError::SyntaxError("bad xref entry flag".into())),
                };
                table.insert(
                    first + i,
                    XRefEntry {
                        offset,
                        genno,
                        in_use,
                    },
                );
            }
        }

        // The trailer dictionary follows the keyword.
        let mut parser = ObjectParser::new(&data[cursor..]);
        let trailer_obj = parser.parse_object()?;
        let trailer = trailer_obj.as_dict()?.clone();

        Ok((table, trailer))
    }

    /// Return the value unchanged unless it is an indirect reference, in
    /// which case dereference it.
    pub fn get_object(&self, obj: &PDFObject) -> Result<PDFObject> {
        match obj {
            PDFObject::Ref(r) => self.deref_object(r),
            other => Ok(other.clone()),
        }
    }

    /// Dereference an indirect reference. Object numbers absent from the
    /// xref table resolve to Null - PDFs tolerate dangling references.
    pub fn deref_object(&self, r: &PDFObjRef) -> Result<PDFObject> {
        match self.getobj_shared(r.objid) {
            Ok(obj) => Ok((*obj).clone()),
            Err(PdfError::ObjectNotFound(_)) => Ok(PDFObject::Null),
            Err(e) => Err(e),
        }
    }

    /// Resolve a possibly-indirect object into shared form.
    pub(crate) fn resolve(&self, obj: &PDFObject) -> Result<Arc<PDFObject>> {
        match obj {
            PDFObject::Ref(r) => match self.getobj_shared(r.objid) {
                Ok(obj) => Ok(obj),
                Err(PdfError::ObjectNotFound(_)) => Ok(Arc::new(PDFObject::Null)),
                Err(e) => Err(e),
            },
            other => Ok(Arc::new(other.clone())),
        }
    }

    /// Get an object by number, resolving and caching on first access.
    /// Later calls return the same shared value without re-reading.
    pub fn getobj_shared(&self, objid: u32) -> Result<Arc<PDFObject>> {
        if let Ok(cache) = self.cache.lock()
            && let Some(obj) = cache.get(&objid)
        {
            return Ok(Arc::clone(obj));
        }

        let entry = *self
            .xref
            .get(&objid)
            .ok_or(PdfError::ObjectNotFound(objid))?;
        if !entry.in_use {
            return Ok(Arc::new(PDFObject::Null));
        }

        // Guard against reference cycles during nested resolution
        // (e.g. /Length pointing back into the object being read).
        {
            let mut resolving = self.resolving.lock().expect("resolving lock");
            if !resolving.insert(objid) {
                return Err(PdfError::SyntaxError(format!(
                    "circular reference for obj {}",
                    objid
                )));
            }
        }
        let result = self.parse_object_at(entry.offset);
        self.resolving
            .lock()
            .expect("resolving lock")
            .remove(&objid);

        let (objid_read, genno_read, obj) = result?;
        if objid_read != objid {
            warn!(
                expected = objid,
                found = objid_read,
                "xref offset points at a different object"
            );
        }

        let obj = if self.security_handler.is_some() {
            self.decrypt_object(obj, objid_read, genno_read as u16)
        } else {
            obj
        };

        let obj = Arc::new(obj);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(objid, Arc::clone(&obj));
        }
        Ok(obj)
    }

    /// Parse an indirect object at a byte offset: `<num> <gen> obj`,
    /// the object body, then either `endobj` or a stream payload.
    fn parse_object_at(&self, offset: usize) -> Result<(u32, u32, PDFObject)> {
        let data = self.data.as_ref();
        if offset >= data.len() {
            return Err(PdfError::SyntaxError(format!(
                "object offset {} exceeds file size {}",
                offset,
                data.len()
            )));
        }

        let body = &data[offset..];
        let mut lexer = Lexer::new(body);
        let objid = match lexer.next_token() {
            Some(Ok((_, Token::Int(n)))) if n >= 0 => n as u32,
            _ => return Err(PdfError::SyntaxError(format!("expected object number at {}", offset))),
        };
        let genno = match lexer.next_token() {
            Some(Ok((_, Token::Int(n)))) if n >= 0 => n as u32,
            _ => return Err(PdfError::SyntaxError(format!("expected generation number at {}", offset))),
        };
        match lexer.next_token() {
            Some(Ok((_, Token::Keyword(Keyword::Obj)))) => {}
            _ => {
                return Err(PdfError::SyntaxError(format!(
                    "expected 'obj' at offset {}",
                    offset
                )));
            }
        }

        let mut parser = ObjectParser::new(body);
        parser.set_pos(lexer.tell());
        let obj = parser.parse_object()?;

        let mut cursor = parser.tell();
        let word = read_nonblank_line(body, &mut cursor);
        match word {
            b"endobj" => Ok((objid, genno, obj)),
            b"stream" => {
                let dict = match obj {
                    PDFObject::Dict(dict) => dict,
                    other => {
                        return Err(PdfError::TypeError {
                            expected: "dict",
                            got: other.type_name(),
                        });
                    }
                };

                // /Length may itself be an indirect reference.
                let length_obj = dict
                    .get("Length")
                    .ok_or_else(|| PdfError::KeyError("Length".to_string()))?;
                let length = self.resolve(length_obj)?.as_int()?;
                if length < 0 {
                    return Err(PdfError::SyntaxError("negative stream length".into()));
                }
                let length = length as usize;

                let start = offset + cursor;
                let end = (start + length).min(data.len());
                if start + length > data.len() {
                    warn!(
                        objid,
                        declared = length,
                        available = data.len().saturating_sub(start),
                        "stream length exceeds file size, truncating"
                    );
                }
                let rawdata = self.data.slice(start..end);

                // Expect endstream then endobj, tolerating one blank line
                // before either keyword.
                let mut after = cursor + (end - start);
                let word = read_nonblank_line(body, &mut after);
                if word != b"endstream" {
                    return Err(PdfError::SyntaxError(format!(
                        "expected 'endstream', found {:?}",
                        String::from_utf8_lossy(word)
                    )));
                }
                let word = read_nonblank_line(body, &mut after);
                if word != b"endobj" {
                    return Err(PdfError::SyntaxError(format!(
                        "expected 'endobj', found {:?}",
                        String::from_utf8_lossy(word)
                    )));
                }

                Ok((
                    objid,
                    genno,
                    PDFObject::Stream(Box::new(PDFStream::new(objid, genno, dict, rawdata))),
                ))
            }
            other => Err(PdfError::SyntaxError(format!(
                "expected 'stream' or 'endobj', found {:?}",
                String::from_utf8_lossy(other)
            ))),
        }
    }

    /// Decrypt strings within a resolved object. Stream payloads stay
    /// encrypted here; they are decrypted chunk by chunk when read.
    fn decrypt_object(&self, obj: PDFObject, objid: u32, genno: u16) -> PDFObject {
        let handler = match &self.security_handler {
            Some(h) => h,
            None => return obj,
        };

        match obj {
            PDFObject::String(data) => PDFObject::String(handler.decrypt(objid, genno, &data)),
            PDFObject::Array(arr) => PDFObject::Array(
                arr.into_iter()
                    .map(|item| self.decrypt_object(item, objid, genno))
                    .collect(),
            ),
            PDFObject::Dict(dict) => PDFObject::Dict(
                dict.into_iter()
                    .map(|(k, v)| (k, self.decrypt_object(v, objid, genno)))
                    .collect(),
            ),
            PDFObject::Stream(mut stream) => {
                stream.attrs = stream
                    .attrs
                    .clone()
                    .into_iter()
                    .map(|(k, v)| (k, self.decrypt_object(v, objid, genno)))
                    .collect();
                PDFObject::Stream(stream)
            }
            other => other,
        }
    }

    /// Decoded content of a stream as a lazy sequence of chunks:
    /// raw window read, per-object RC4 decryption, then inflation.
    pub fn stream_chunks(&self, stream: &PDFStream) -> Result<StreamChunks> {
        let cipher = self
            .security_handler
            .as_ref()
            .map(|h| h.object_cipher(stream.objid, stream.genno as u16));

        let inflater = match self.stream_filter(stream)? {
            None => None,
            Some(name) if name == "FlateDecode" => Some(Inflater::new()),
            Some(name) => {
                return Err(PdfError::DecodeError(format!(
                    "unsupported stream filter: /{}",
                    name
                )));
            }
        };

        Ok(StreamChunks {
            raw: stream.rawdata_bytes(),
            pos: 0,
            cipher,
            inflater,
            done: false,
        })
    }

    /// Resolve the stream's /Filter entry to a single filter name.
    fn stream_filter(&self, stream: &PDFStream) -> Result<Option<String>> {
        let filter = match stream.get("Filter") {
            Some(f) => self.resolve(f)?,
            None => return Ok(None),
        };
        match &*filter {
            PDFObject::Name(name) => Ok(Some(name.clone())),
            PDFObject::Array(arr) if arr.is_empty() => Ok(None),
            PDFObject::Array(arr) if arr.len() == 1 => {
                Ok(Some(self.resolve(&arr[0])?.as_name()?.to_string()))
            }
            PDFObject::Null => Ok(None),
            _ => Err(PdfError::DecodeError("unsupported filter chain".into())),
        }
    }

    /// Decode a whole stream into one buffer.
    pub fn decode_stream(&self, stream: &PDFStream) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        for chunk in self.stream_chunks(stream)? {
            out.extend(chunk?);
        }
        Ok(out)
    }

    /// Decoded content for a stream value or reference. A dangling
    /// reference yields an empty sequence.
    pub fn get_stream(&self, obj: &PDFObject) -> Result<StreamChunks> {
        let resolved = self.resolve(obj)?;
        match &*resolved {
            PDFObject::Stream(stream) => self.stream_chunks(stream),
            PDFObject::Null => Ok(StreamChunks::empty()),
            other => Err(PdfError::TypeError {
                expected: "stream",
                got: other.type_name(),
            }),
        }
    }
}

/// Lazy chunked stream content: raw windows, decrypted and inflated on
/// demand. Yields decoded chunks; a decode failure yields one `Err` and
/// then terminates.
pub struct StreamChunks {
    raw: Bytes,
    pos: usize,
    cipher: Option<crate::codec::arcfour::Arcfour>,
    inflater: Option<Inflater>,
    done: bool,
}

impl StreamChunks {
    fn empty() -> Self {
        Self {
            raw: Bytes::new(),
            pos: 0,
            cipher: None,
            inflater: None,
            done: false,
        }
    }
}

impl Iterator for StreamChunks {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while self.pos < self.raw.len() {
            let end = (self.pos + CHUNK_SIZE).min(self.raw.len());
            let mut chunk = self.raw[self.pos..end].to_vec();
            self.pos = end;

            if let Some(cipher) = &mut self.cipher {
                chunk = cipher.process(&chunk);
            }

            match &mut self.inflater {
                None => return Some(Ok(chunk)),
                Some(inflater) => match inflater.push(&chunk) {
                    Ok(out) if out.is_empty() => continue,
                    Ok(out) => return Some(Ok(out)),
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                },
            }
        }

        self.done = true;
        if let Some(inflater) = &self.inflater
            && !inflater.is_finished()
            && !self.raw.is_empty()
        {
            warn!("stream ended before deflate end marker");
        }
        None
    }
}

/// Trim PDF whitespace from both ends of a line.
fn trim(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|b| !Lexer::is_whitespace(*b))
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|b| !Lexer::is_whitespace(*b))
        .map_or(start, |i| i + 1);
    &line[start..end]
}

fn parse_int<T: std::str::FromStr>(field: Option<&[u8]>) -> Option<T> {
    std::str::from_utf8(field?).ok()?.parse().ok()
}

/// Read one line, consuming the EOL (\r, \n, or \r\n).
fn read_line<'d>(data: &'d [u8], pos: &mut usize) -> &'d [u8] {
    let start = *pos;
    while *pos < data.len() && data[*pos] != b'\n' && data[*pos] != b'\r' {
        *pos += 1;
    }
    let line = &data[start..*pos];
    if *pos < data.len() {
        if data[*pos] == b'\r' {
            *pos += 1;
            if *pos < data.len() && data[*pos] == b'\n' {
                *pos += 1;
            }
        } else {
            *pos += 1;
        }
    }
    line
}

/// Read the next line, skipping at most one blank line.
fn read_nonblank_line<'d>(data: &'d [u8], pos: &mut usize) -> &'d [u8] {
    let line = trim(read_line(data, pos));
    if line.is_empty() && *pos < data.len() {
        return trim(read_line(data, pos));
    }
    line
}

/// Iterate lines backward from the end of the buffer.
struct RLines<'d> {
    data: &'d [u8],
    end: usize,
    done: bool,
}

impl<'d> RLines<'d> {
    fn new(data: &'d [u8]) -> Self {
        Self {
            data,
            end: data.len(),
            done: false,
        }
    }
}

impl<'d> Iterator for RLines<'d> {
    type Item = &'d [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let end = self.end;
        let mut start = end;
        while start > 0 && self.data[start - 1] != b'\n' && self.data[start - 1] != b'\r' {
            start -= 1;
        }
        let line = &self.data[start..end];

        // Consume the EOL that precedes this line
        let mut new_end = start;
        if new_end > 0 && self.data[new_end - 1] == b'\n' {
            new_end -= 1;
            if new_end > 0 && self.data[new_end - 1] == b'\r' {
                new_end -= 1;
            }
        } else if new_end > 0 && self.data[new_end - 1] == b'\r' {
            new_end -= 1;
        }

        if start == 0 {
            self.done = true;
        }
        self.end = new_end;
        Some(line)
    }
}
