//! PDF object types.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use std::fmt;

/// Dictionary with keys kept in file order.
pub type PDFDict = IndexMap<String, PDFObject>;

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PDFObject {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Real(f64),
    /// Name object (e.g., /Type, /Font), stored without the slash
    Name(String),
    /// String (byte array, escapes already decoded)
    String(Vec<u8>),
    Array(Vec<Self>),
    Dict(PDFDict),
    Stream(Box<PDFStream>),
    /// Indirect object reference
    Ref(PDFObjRef),
}

impl PDFObject {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(PdfError::TypeError {
                expected: "bool",
                got: self.type_name(),
            }),
        }
    }

    pub fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            // Writers regularly emit integral reals where integers belong.
            Self::Real(n) if n.fract() == 0.0 => Ok(*n as i64),
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

    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "name",
                got: self.type_name(),
            }),
        }
    }

    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "string",
                got: self.type_name(),
            }),
        }
    }

    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as dictionary. A stream answers with its attribute dictionary.
    pub fn as_dict(&self) -> Result<&PDFDict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    pub fn as_stream(&self) -> Result<&PDFStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    pub const fn as_objref(&self) -> Result<&PDFObjRef> {
        match self {
            Self::Ref(r) => Ok(r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Reads a numeric array such as a `/BBox` or `/Matrix`.
    pub fn as_numbers(&self) -> Result<Vec<f64>> {
        self.as_array()?.iter().map(Self::as_num).collect()
    }

    pub const fn type_name(&self) -> &'static str {
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

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }
}

impl fmt::Display for PDFObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Real(n) => write!(f, "{n}"),
            Self::Name(n) => write!(f, "/{n}"),
            Self::String(s) => {
                if s.iter().all(|b| (0x20..0x7f).contains(b)) {
                    write!(f, "({})", String::from_utf8_lossy(s))
                } else {
                    write!(f, "<")?;
                    for b in s {
                        write!(f, "{b:02x}")?;
                    }
                    write!(f, ">")
                }
            }
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Dict(d) => fmt_dict(f, d),
            Self::Stream(s) => {
                fmt_dict(f, &s.attrs)?;
                write!(f, " stream[{} bytes]", s.rawdata.len())
            }
            Self::Ref(r) => write!(f, "{} {} R", r.objid, r.genno),
        }
    }
}

fn fmt_dict(f: &mut fmt::Formatter<'_>, d: &PDFDict) -> fmt::Result {
    write!(f, "<<")?;
    for (k, v) in d {
        write!(f, " /{k} {v}")?;
    }
    write!(f, " >>")
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PDFObjRef {
    pub objid: u32,
    pub genno: u32,
}

impl PDFObjRef {
    pub const fn new(objid: u32, genno: u32) -> Self {
        Self { objid, genno }
    }
}

/// PDF Stream - dictionary attributes + raw (still encoded) data.
#[derive(Debug, Clone, PartialEq)]
pub struct PDFStream {
    pub attrs: PDFDict,
    rawdata: Bytes,
    /// Object ID (set when the stream is an indirect object of a document)
    pub objid: Option<u32>,
    pub genno: Option<u32>,
}

impl PDFStream {
    pub fn new(attrs: PDFDict, rawdata: impl Into<Bytes>) -> Self {
        Self {
            attrs,
            rawdata: rawdata.into(),
            objid: None,
            genno: None,
        }
    }

    pub const fn set_objid(&mut self, objid: u32, genno: u32) {
        self.objid = Some(objid);
        self.genno = Some(genno);
    }

    pub fn get_rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    pub fn rawdata_bytes(&self) -> Bytes {
        self.rawdata.clone()
    }

    /// Replaces the raw data, used after decryption.
    pub fn set_rawdata(&mut self, data: impl Into<Bytes>) {
        self.rawdata = data.into();
    }

    pub fn get(&self, name: &str) -> Option<&PDFObject> {
        self.attrs.get(name)
    }

    /// Get attribute, trying multiple names (full and abbreviated keys).
    pub fn get_any(&self, names: &[&str]) -> Option<&PDFObject> {
        names.iter().find_map(|name| self.attrs.get(*name))
    }

    /// `/Type` or `/Subtype` comparison helper.
    pub fn is_type(&self, key: &str, value: &str) -> bool {
        matches!(self.attrs.get(key), Some(PDFObject::Name(n)) if n == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_report_type() {
        let obj = PDFObject::Name("Font".into());
        assert_eq!(obj.as_name().unwrap(), "Font");
        let err = obj.as_int().unwrap_err();
        assert!(matches!(
            err,
            PdfError::TypeError {
                expected: "int",
                got: "name"
            }
        ));
        assert_eq!(PDFObject::Real(3.0).as_int().unwrap(), 3);
    }

    #[test]
    fn test_display_round_shapes() {
        let mut d = PDFDict::new();
        d.insert("Type".into(), PDFObject::name("Page"));
        d.insert("Parent".into(), PDFObject::Ref(PDFObjRef::new(2, 0)));
        d.insert(
            "MediaBox".into(),
            PDFObject::Array(vec![PDFObject::Int(0), PDFObject::Real(612.5)]),
        );
        assert_eq!(
            PDFObject::Dict(d).to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 612.5] >>"
        );
        assert_eq!(PDFObject::String(vec![0, 255]).to_string(), "<00ff>");
    }
}
