//! FlateDecode (zlib/deflate) decompression.

use crate::error::{PdfError, Result};
use flate2::{Decompress, FlushDecompress, Status};
use std::io::Read;
use tracing::warn;

/// Inflate a complete zlib stream.
///
/// Falls back to lenient byte-at-a-time decompression when the decoder
/// reports an error, salvaging partial output from streams with trailing
/// corruption (commonly bad CRCs). Fails with a decode error only when
/// nothing could be recovered.
pub fn flate_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    if decoder.read_to_end(&mut out).is_ok() {
        return Ok(out);
    }

    let salvaged = decompress_corrupted(data);
    if salvaged.is_empty() {
        return Err(PdfError::DecodeError(
            "flate decompression failed".to_string(),
        ));
    }
    warn!(
        salvaged = salvaged.len(),
        "corrupted flate stream, keeping partial output"
    );
    Ok(salvaged)
}

/// Best-effort zlib decompression for corrupted streams: feed one byte at
/// a time and keep whatever comes out before the decoder fails.
fn decompress_corrupted(data: &[u8]) -> Vec<u8> {
    let mut decoder = Decompress::new(true);
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut buf = [0u8; 4096];
    let mut i = 0usize;
    while i < data.len() {
        let before_out = decoder.total_out();
        let before_in = decoder.total_in();
        let res = decoder.decompress(&data[i..i + 1], &mut buf, FlushDecompress::None);
        let produced = (decoder.total_out() - before_out) as usize;
        if produced > 0 {
            out.extend_from_slice(&buf[..produced]);
        }
        let consumed = (decoder.total_in() - before_in) as usize;
        i += consumed.max(1);
        match res {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) => {}
        }
    }
    out
}

/// Streaming inflater for chunked input.
///
/// The caller pushes raw chunks as they come off the (possibly decrypted)
/// byte window; decompressed output accumulates per push.
pub struct Inflater {
    decoder: Decompress,
    finished: bool,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            decoder: Decompress::new(true),
            finished: false,
        }
    }

    /// Whether the underlying stream reported its end marker.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed one chunk of compressed input, returning the bytes inflated
    /// from it.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        let mut offset = 0usize;

        while offset < chunk.len() && !self.finished {
            let before_in = self.decoder.total_in();
            let before_out = self.decoder.total_out();
            let status = self
                .decoder
                .decompress(&chunk[offset..], &mut buf, FlushDecompress::None)
                .map_err(|e| PdfError::DecodeError(format!("flate: {}", e)))?;
            let consumed = (self.decoder.total_in() - before_in) as usize;
            let produced = (self.decoder.total_out() - before_out) as usize;
            out.extend_from_slice(&buf[..produced]);
            offset += consumed;
            match status {
                Status::StreamEnd => self.finished = true,
                Status::Ok | Status::BufError => {
                    if consumed == 0 && produced == 0 {
                        break;
                    }
                }
            }
        }

        Ok(out)
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}
