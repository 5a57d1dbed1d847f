//! PDF object types.
//!
//! The closed value domain produced by the object parser: every syntactic
//! construct in a PDF body maps onto exactly one `PDFObject` variant.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use std::collections::HashMap;

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum PDFObject {
    /// Null object
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name object (e.g., /Type, /Font), stored without the leading slash
    Name(String),
    /// String (byte array)
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(HashMap<String, Self>),
    /// Stream (dictionary + raw byte payload)
    Stream(Box<PDFStream>),
    /// Indirect object reference
    Ref(PDFObjRef),
}

impl PDFObject {
    /// Check if this is a null object
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get as boolean
    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(PdfError::TypeError {
                expected: "bool",
                got: self.type_name(),
            }),
        }
    }

    /// Get as integer
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "int",
                got: self.type_name(),
            }),
        }
    }

    /// Get numeric value (int or real coerced to f64)
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "number",
                got: self.type_name(),
            }),
        }
    }

    /// Get as name string
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "name",
                got: self.type_name(),
            }),
        }
    }

    /// Get as byte string
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "string",
                got: self.type_name(),
            }),
        }
    }

    /// Get as array
    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as dictionary
    pub const fn as_dict(&self) -> Result<&HashMap<String, Self>> {
        match self {
            Self::Dict(d) => Ok(d),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as stream
    pub fn as_stream(&self) -> Result<&PDFStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    /// Get as object reference
    pub const fn as_ref(&self) -> Result<&PDFObjRef> {
        match self {
            Self::Ref(r) => Ok(r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Get type name for error messages
    pub(crate) const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PDFObjRef {
    /// Object number
    pub objid: u32,
    /// Generation number
    pub genno: u32,
}

impl PDFObjRef {
    /// Create a new object reference.
    pub const fn new(objid: u32, genno: u32) -> Self {
        Self { objid, genno }
    }
}

/// PDF Stream - dictionary attributes plus the raw byte payload.
///
/// The payload is a zero-copy slice of the document buffer, taken at
/// resolution time from the declared byte range. Decryption and
/// decompression happen later, when the stream content is pulled.
#[derive(Debug, Clone, PartialEq)]
pub struct PDFStream {
    /// Stream dictionary attributes
    pub attrs: HashMap<String, PDFObject>,
    /// Raw (possibly encrypted/compressed) data
    rawdata: Bytes,
    /// Object number (set when the stream is resolved from the document)
    pub objid: u32,
    /// Generation number
    pub genno: u32,
}

impl PDFStream {
    /// Create a new stream.
    pub fn new(
        objid: u32,
        genno: u32,
        attrs: HashMap<String, PDFObject>,
        rawdata: impl Into<Bytes>,
    ) -> Self {
        Self {
            attrs,
            rawdata: rawdata.into(),
            objid,
            genno,
        }
    }

    /// Get raw (undecoded) data.
    pub fn rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    /// Get raw data as shared bytes.
    pub fn rawdata_bytes(&self) -> Bytes {
        self.rawdata.clone()
    }

    /// Declared length of the raw payload.
    pub fn len(&self) -> usize {
        self.rawdata.len()
    }

    /// Whether the raw payload is empty.
    pub fn is_empty(&self) -> bool {
        self.rawdata.is_empty()
    }

    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&PDFObject> {
        self.attrs.get(name)
    }
}
