//! Test fixture builder: assembles well-formed PDF bytes with correct
//! xref offsets, optional Flate compression and optional RC4 encryption.
#![allow(dead_code)]

use std::collections::BTreeMap;
use tinta_core::codec::Arcfour;
use tinta_core::document::security::PASSWORD_PADDING;

pub struct PdfBuilder {
    buf: Vec<u8>,
    offsets: BTreeMap<u32, usize>,
    trailer_extra: String,
    encryption: Option<R2Encryption>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            buf: b"%PDF-1.4\n".to_vec(),
            offsets: BTreeMap::new(),
            trailer_extra: String::new(),
            encryption: None,
        }
    }

    /// Add a plain indirect object with the given body text.
    pub fn add_object(&mut self, objid: u32, body: &str) -> &mut Self {
        self.offsets.insert(objid, self.buf.len());
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", objid, body).as_bytes());
        self
    }

    /// Add a stream object; `dict_extra` holds entries besides /Length.
    /// When encryption is configured the payload is RC4-encrypted with
    /// the per-object key.
    pub fn add_stream(&mut self, objid: u32, dict_extra: &str, data: &[u8]) -> &mut Self {
        let data = match &self.encryption {
            Some(enc) => enc.encrypt(objid, 0, data),
            None => data.to_vec(),
        };
        self.offsets.insert(objid, self.buf.len());
        self.buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< {} /Length {} >>\nstream\n",
                objid,
                dict_extra,
                data.len()
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(&data);
        self.buf.extend_from_slice(b"\nendstream\nendobj\n");
        self
    }

    /// Add a Flate-compressed stream object.
    pub fn add_flate_stream(&mut self, objid: u32, dict_extra: &str, data: &[u8]) -> &mut Self {
        use flate2::Compression;
        use flate2::write::ZlibEncoder;
        use std::io::Write;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let compressed = encoder.finish().unwrap();

        let extra = format!("{} /Filter /FlateDecode", dict_extra);
        self.add_stream(objid, &extra, &compressed)
    }

    /// Append extra entries to the trailer dictionary.
    pub fn trailer_extra(&mut self, extra: &str) -> &mut Self {
        self.trailer_extra.push_str(extra);
        self
    }

    /// Configure RC4 revision-2 encryption. Call before adding streams;
    /// adds the /Encrypt object and trailer entries on finish.
    pub fn encrypt_r2(&mut self, user_password: &str, owner_password: &str) -> &mut Self {
        self.encryption = Some(R2Encryption::new(user_password, owner_password));
        self
    }

    /// Write the xref table, trailer, startxref and %%EOF.
    pub fn finish(&mut self, size: u32, root: u32) -> Vec<u8> {
        let mut trailer_extra = self.trailer_extra.clone();

        if let Some(enc) = self.encryption.clone() {
            let encrypt_id = size - 1;
            self.add_object(
                encrypt_id,
                &format!(
                    "<< /Filter /Standard /V 1 /R 2 /Length 40 /P {} /O {} /U {} >>",
                    enc.permissions,
                    hex_string(&enc.o),
                    hex_string(&enc.u),
                ),
            );
            trailer_extra.push_str(&format!(
                " /Encrypt {} 0 R /ID [ {} {} ]",
                encrypt_id,
                hex_string(&enc.docid),
                hex_string(&enc.docid),
            ));
        }

        let startxref = self.buf.len();
        let max_id = self.offsets.keys().max().copied().unwrap_or(0);
        self.buf
            .extend_from_slice(format!("xref\n0 {}\n", max_id + 1).as_bytes());
        self.buf
            .extend_from_slice(b"0000000000 65535 f \n");
        for objid in 1..=max_id {
            match self.offsets.get(&objid) {
                Some(offset) => {
                    self.buf
                        .extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
                }
                None => {
                    self.buf.extend_from_slice(b"0000000000 65535 f \n");
                }
            }
        }
        self.buf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R{} >>\nstartxref\n{}\n%%EOF\n",
                size, root, trailer_extra, startxref
            )
            .as_bytes(),
        );
        self.buf.clone()
    }

    /// Current buffer length (useful for appended revisions).
    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

/// Build a minimal one-page document whose content stream is `content`.
/// Object layout: 1 = catalog, 2 = pages, 3 = page, 4 = content stream,
/// 5 = /F1 font.
pub fn one_page_pdf(font_body: &str, content: &[u8]) -> Vec<u8> {
    let mut builder = PdfBuilder::new();
    builder
        .add_object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .add_object(2, "<< /Type /Pages /Kids [ 3 0 R ] /Count 1 >>")
        .add_object(
            3,
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R \
             /Resources << /Font << /F1 5 0 R >> >> >>",
        )
        .add_stream(4, "", content)
        .add_object(5, font_body);
    builder.finish(6, 1)
}

/// RC4 revision-2 material: O/U values per the standard algorithms, plus
/// the derived 40-bit document key.
#[derive(Clone)]
pub struct R2Encryption {
    pub o: Vec<u8>,
    pub u: Vec<u8>,
    pub key: Vec<u8>,
    pub docid: Vec<u8>,
    pub permissions: i64,
}

impl R2Encryption {
    pub fn new(user_password: &str, owner_password: &str) -> Self {
        let permissions: i64 = -44;
        let docid = b"tinta-test-document-id".to_vec();

        // Algorithm 3: O from the owner password
        let owner_key = md5::compute(pad_password(owner_password.as_bytes()));
        let o = Arcfour::new(&owner_key.0[..5]).process(&pad_password(user_password.as_bytes()));

        // Algorithm 2: document key from the user password
        let mut context = md5::Context::new();
        context.consume(pad_password(user_password.as_bytes()));
        context.consume(&o);
        context.consume((permissions as u32).to_le_bytes());
        context.consume(&docid);
        let key = context.finalize().0[..5].to_vec();

        // Algorithm 4: U value
        let u = Arcfour::new(&key).process(&PASSWORD_PADDING);

        Self {
            o,
            u,
            key,
            docid,
            permissions,
        }
    }

    /// Encrypt one object's bytes with its derived key.
    pub fn encrypt(&self, objid: u32, genno: u16, data: &[u8]) -> Vec<u8> {
        let mut key_data = self.key.clone();
        key_data.extend_from_slice(&objid.to_le_bytes()[..3]);
        key_data.extend_from_slice(&genno.to_le_bytes());
        let hash = md5::compute(&key_data);
        let key_len = (self.key.len() + 5).min(16);
        Arcfour::new(&hash.0[..key_len]).process(data)
    }
}

fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
    padded
}

/// Render bytes as a PDF hex string literal.
pub fn hex_string(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len() * 2 + 2);
    out.push('<');
    for b in data {
        out.push_str(&format!("{:02X}", b));
    }
    out.push('>');
    out
}
