//! Standard security handler (RC4 revisions 2 and 3).
//!
//! Derives one document-wide encryption key from the password material in
//! the /Encrypt dictionary and the document ID, then per-object keys for
//! stream and string decryption. Revision 4 crypt filters and
//! non-/Standard filters are explicitly unsupported.

use crate::codec::arcfour::Arcfour;
use crate::error::{PdfError, Result};
use crate::model::objects::PDFObject;
use std::collections::HashMap;

/// Password padding constant from the PDF spec (Algorithm 2).
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// Standard security handler for V=1/R=2 (40-bit RC4) and V=2/R=3
/// (variable-length RC4 up to 128-bit).
pub struct StandardSecurityHandler {
    /// The computed document encryption key.
    key: Vec<u8>,
    /// Revision number (2 or 3).
    r: i64,
    /// Key length in bits.
    length: i64,
    /// Owner password hash (O value).
    o: Vec<u8>,
    /// User password hash (U value).
    u: Vec<u8>,
    /// Permission flags (P value).
    p: u32,
    /// Document ID (first element).
    docid: Vec<u8>,
}

impl StandardSecurityHandler {
    /// Supported revision values.
    pub const SUPPORTED_REVISIONS: [i64; 2] = [2, 3];

    /// Create a handler from the /Encrypt dictionary, authenticating with
    /// `password` as user password, then as owner password.
    pub fn new(
        encrypt: &HashMap<String, PDFObject>,
        doc_id: &[Vec<u8>],
        password: &str,
    ) -> Result<Self> {
        let filter = encrypt
            .get("Filter")
            .and_then(|f| f.as_name().ok())
            .unwrap_or("");
        if filter != "Standard" {
            return Err(PdfError::EncryptionError(format!(
                "unsupported security filter: /{}",
                filter
            )));
        }

        let v = get_int_default(encrypt, "V", 0);
        if v >= 4 {
            return Err(PdfError::EncryptionError(format!(
                "crypt filters are not supported (V={})",
                v
            )));
        }

        let r = get_int(encrypt, "R")?;
        if !Self::SUPPORTED_REVISIONS.contains(&r) {
            return Err(PdfError::EncryptionError(format!(
                "unsupported revision: R={}",
                r
            )));
        }

        let length = get_int_default(encrypt, "Length", 40).min(128);
        let o = get_bytes(encrypt, "O")?;
        let u = get_bytes(encrypt, "U")?;
        let p = get_int(encrypt, "P")? as u32;

        let docid = doc_id.first().cloned().unwrap_or_default();

        let mut handler = Self {
            key: vec![],
            r,
            length,
            o,
            u,
            p,
            docid,
        };

        let password_bytes = password.as_bytes();
        if let Some(key) = handler.authenticate_user_password(password_bytes) {
            handler.key = key;
            Ok(handler)
        } else if let Some(key) = handler.authenticate_owner_password(password_bytes) {
            handler.key = key;
            Ok(handler)
        } else {
            Err(PdfError::EncryptionError("incorrect password".into()))
        }
    }

    /// The derived document key (exposed for diagnostics and tests).
    pub fn encryption_key(&self) -> &[u8] {
        &self.key
    }

    /// Pad or truncate a password to 32 bytes (Algorithm 2 step a).
    fn pad_password(password: &[u8]) -> [u8; 32] {
        let mut padded = [0u8; 32];
        let len = password.len().min(32);
        padded[..len].copy_from_slice(&password[..len]);
        padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);
        padded
    }

    /// Compute the document encryption key from a password (Algorithm 2).
    fn compute_encryption_key(&self, password: &[u8]) -> Vec<u8> {
        let mut context = md5::Context::new();
        context.consume(Self::pad_password(password));
        context.consume(&self.o);
        context.consume(self.p.to_le_bytes());
        context.consume(&self.docid);
        let mut result = context.finalize().0.to_vec();

        let n = self.key_len();

        // For R3, rehash the first n bytes 50 times
        if self.r >= 3 {
            for _ in 0..50 {
                result = md5::compute(&result[..n]).0.to_vec();
            }
        }

        result[..n].to_vec()
    }

    /// Document key length in bytes: 5 for R2, /Length bits for R3.
    fn key_len(&self) -> usize {
        if self.r >= 3 { (self.length / 8) as usize } else { 5 }
    }

    /// Compute the U value from a candidate key (Algorithms 4 and 5).
    fn compute_u_value(&self, key: &[u8]) -> Vec<u8> {
        if self.r == 2 {
            Arcfour::new(key).process(&PASSWORD_PADDING)
        } else {
            let mut context = md5::Context::new();
            context.consume(PASSWORD_PADDING);
            context.consume(&self.docid);
            let hash = context.finalize();

            let mut result = Arcfour::new(key).process(&hash.0);
            for i in 1..20u8 {
                let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
                result = Arcfour::new(&xor_key).process(&result);
            }

            // Pad to 32 bytes by repeating
            let mut padded = result.clone();
            padded.extend_from_slice(&result);
            padded.truncate(32);
            padded
        }
    }

    /// Verify a candidate key against the stored U value (Algorithm 6).
    fn verify_encryption_key(&self, key: &[u8]) -> bool {
        let computed_u = self.compute_u_value(key);
        if self.r == 2 {
            computed_u == self.u
        } else {
            // R3 compares the first 16 bytes only
            computed_u.len() >= 16 && self.u.len() >= 16 && computed_u[..16] == self.u[..16]
        }
    }

    fn authenticate_user_password(&self, password: &[u8]) -> Option<Vec<u8>> {
        let key = self.compute_encryption_key(password);
        self.verify_encryption_key(&key).then_some(key)
    }

    /// Authenticate with the owner password (Algorithm 7): decrypt the O
    /// value to recover the user password, then authenticate with that.
    fn authenticate_owner_password(&self, password: &[u8]) -> Option<Vec<u8>> {
        let mut hash = md5::compute(Self::pad_password(password)).0.to_vec();
        if self.r >= 3 {
            for _ in 0..50 {
                hash = md5::compute(&hash).0.to_vec();
            }
        }
        let key = &hash[..self.key_len()];

        let user_password = if self.r == 2 {
            Arcfour::new(key).process(&self.o)
        } else {
            let mut result = self.o.clone();
            for i in (0..20u8).rev() {
                let xor_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
                result = Arcfour::new(&xor_key).process(&result);
            }
            result
        };

        self.authenticate_user_password(&user_password)
    }

    /// Create an RC4 cipher keyed for one object (Algorithm 1).
    ///
    /// The per-object key is MD5(document key + objid as 3 bytes LE +
    /// genno as 2 bytes LE), truncated to min(keylen + 5, 16) bytes. One
    /// cipher instance decrypts the whole object; callers drive it chunk
    /// by chunk.
    pub fn object_cipher(&self, objid: u32, genno: u16) -> Arcfour {
        let mut key_data = self.key.clone();
        key_data.extend_from_slice(&objid.to_le_bytes()[..3]);
        key_data.extend_from_slice(&genno.to_le_bytes());

        let hash = md5::compute(&key_data);
        let key_len = (self.key.len() + 5).min(16);
        Arcfour::new(&hash.0[..key_len])
    }

    /// Decrypt a whole object payload (strings, or a stream in one shot).
    pub fn decrypt(&self, objid: u32, genno: u16, data: &[u8]) -> Vec<u8> {
        self.object_cipher(objid, genno).process(data)
    }
}

/// Helper: required integer entry of the encrypt dict.
fn get_int(encrypt: &HashMap<String, PDFObject>, key: &str) -> Result<i64> {
    encrypt
        .get(key)
        .ok_or_else(|| PdfError::EncryptionError(format!("missing {} in /Encrypt", key)))?
        .as_int()
}

/// Helper: integer entry with default.
fn get_int_default(encrypt: &HashMap<String, PDFObject>, key: &str, default: i64) -> i64 {
    encrypt
        .get(key)
        .and_then(|v| v.as_int().ok())
        .unwrap_or(default)
}

/// Helper: required byte-string entry of the encrypt dict.
fn get_bytes(encrypt: &HashMap<String, PDFObject>, key: &str) -> Result<Vec<u8>> {
    encrypt
        .get(key)
        .ok_or_else(|| PdfError::EncryptionError(format!("missing {} in /Encrypt", key)))?
        .as_string()
        .map(|s| s.to_vec())
}
