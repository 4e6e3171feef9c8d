//! Object streams (`/Type /ObjStm`): compressed containers of objects.

use crate::error::{PdfError, Result};
use crate::model::objects::{PDFObject, PDFStream};
use crate::parser::lexer::Token;
use crate::parser::object::PDFParser;
use bytes::Bytes;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// A decoded object stream with its header of `(objnum, offset)` pairs.
#[derive(Debug)]
pub struct ObjectStream {
    objid: u32,
    data: Bytes,
    first: usize,
    header: Vec<(u32, usize)>,
}

impl ObjectStream {
    /// Parses the header of an already decoded stream.
    pub fn parse(objid: u32, stream: &PDFStream, decoded: Vec<u8>) -> Result<Self> {
        let bad = |msg: &str| PdfError::malformed(0, format!("object stream {objid}: {msg}"));
        let int = |key: &str| {
            stream
                .get(key)
                .and_then(|v| v.as_int().ok())
                .and_then(|n| usize::try_from(n).ok())
                .ok_or_else(|| bad(&format!("missing /{key}")))
        };
        let count = int("N")?;
        let first = int("First")?;
        let data = Bytes::from(decoded);
        if first > data.len() {
            return Err(bad("/First beyond decoded data"));
        }

        // Every header pair takes at least one byte of the `/First` region.
        let wanted = count
            .checked_mul(2)
            .filter(|_| count <= first)
            .ok_or_else(|| bad(&format!("/N {count} does not fit a {first} byte header")))?;

        let mut parser = PDFParser::new(data.slice(..first));
        let mut numbers = Vec::with_capacity(wanted.min(first / 2 + 1));
        while numbers.len() < wanted {
            match parser.next_token()? {
                Some((_, Token::Int(n))) if n >= 0 => numbers.push(n as usize),
                Some((pos, _)) => return Err(PdfError::malformed(pos, "object stream header must be integers")),
                None => break,
            }
        }
        if numbers.len() < wanted {
            warn!(objid, declared = count, found = numbers.len() / 2, "short object stream header");
        }
        let header = numbers
            .into_iter()
            .tuples()
            .map(|(objnum, offset)| (objnum as u32, offset))
            .collect();
        debug!(objid, count, "loaded object stream");
        Ok(Self {
            objid,
            data,
            first,
            header,
        })
    }

    pub fn objid(&self) -> u32 {
        self.objid
    }

    pub fn len(&self) -> usize {
        self.header.len()
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// Object numbers in header order.
    pub fn objnums(&self) -> impl Iterator<Item = u32> + '_ {
        self.header.iter().map(|(n, _)| *n)
    }

    /// Parses the object the xref table places at `index`.
    ///
    /// When the header disagrees about which object sits there, the header is
    /// searched for `objnum` instead.
    pub fn get(&self, objnum: u32, index: usize) -> Result<PDFObject> {
        let offset = match self.header.get(index) {
            Some(&(n, offset)) if n == objnum => offset,
            _ => {
                let found = self.header.iter().find(|(n, _)| *n == objnum);
                match found {
                    Some(&(_, offset)) => {
                        warn!(objnum, index, stream = self.objid, "object stream index mismatch");
                        offset
                    }
                    None => {
                        return Err(PdfError::xref(format!(
                            "object {objnum} not in object stream {}",
                            self.objid
                        )));
                    }
                }
            }
        };
        let pos = self
            .first
            .checked_add(offset)
            .filter(|pos| *pos < self.data.len())
            .ok_or_else(|| {
                PdfError::malformed(
                    self.first,
                    format!("object {objnum} offset {offset} is past the end of object stream {}", self.objid),
                )
            })?;
        let mut parser = PDFParser::new(self.data.clone());
        let object = parser.parse_object_at(pos)?;
        if matches!(parser.peek(0)?, Some(t) if t.is_keyword(b"stream")) {
            return Err(PdfError::malformed(pos, "stream inside an object stream"));
        }
        Ok(object)
    }
}

/// Decoded object streams keyed by their object number.
#[derive(Debug, Default)]
pub(crate) struct ObjectStreamCache {
    streams: Mutex<FxHashMap<u32, Arc<ObjectStream>>>,
}

impl ObjectStreamCache {
    pub(crate) fn get_or_load(
        &self,
        objid: u32,
        load: impl FnOnce() -> Result<ObjectStream>,
    ) -> Result<Arc<ObjectStream>> {
        if let Ok(streams) = self.streams.lock()
            && let Some(found) = streams.get(&objid)
        {
            return Ok(Arc::clone(found));
        }
        // Loaded outside the lock; a racing thread may load it twice.
        let loaded = Arc::new(load()?);
        if let Ok(mut streams) = self.streams.lock() {
            streams.entry(objid).or_insert_with(|| Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    pub(crate) fn clear(&mut self) {
        if let Ok(streams) = self.streams.get_mut() {
            streams.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::PDFDict;

    fn objstm(n: i64, header: &str, body: &str) -> (PDFStream, Vec<u8>) {
        let mut attrs = PDFDict::new();
        attrs.insert("Type".into(), PDFObject::name("ObjStm"));
        attrs.insert("N".into(), PDFObject::Int(n));
        attrs.insert("First".into(), PDFObject::Int(header.len() as i64));
        let data = format!("{header}{body}").into_bytes();
        (PDFStream::new(attrs, data.clone()), data)
    }

    #[test]
    fn test_objects_by_index() {
        let (stream, data) = objstm(2, "11 0 12 8 ", "<</A 1>>[1 2]");
        let objstm = ObjectStream::parse(5, &stream, data).unwrap();
        assert_eq!(objstm.len(), 2);
        assert_eq!(objstm.get(12, 1).unwrap().as_numbers().unwrap(), vec![1.0, 2.0]);
        assert!(objstm.get(11, 0).unwrap().as_dict().is_ok());
    }

    #[test]
    fn test_index_mismatch_falls_back_to_header() {
        let (stream, data) = objstm(2, "11 0 12 8 ", "<</A 1>>[1 2]");
        let objstm = ObjectStream::parse(5, &stream, data).unwrap();
        assert!(objstm.get(12, 0).unwrap().as_array().is_ok());
        assert!(matches!(
            objstm.get(13, 0),
            Err(PdfError::BrokenCrossReference(_))
        ));
    }

    #[test]
    fn test_absurd_count_is_malformed() {
        let (stream, data) = objstm(i64::MAX / 2, "1 0 ", "(x)");
        assert!(matches!(
            ObjectStream::parse(5, &stream, data),
            Err(PdfError::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_offset_past_end_is_malformed() {
        let header = format!("7 0 8 9999 9 {} ", i64::MAX);
        let (stream, data) = objstm(3, &header, "(x)");
        let objstm = ObjectStream::parse(5, &stream, data).unwrap();
        assert!(objstm.get(7, 0).is_ok());
        for (objnum, index) in [(8, 1), (9, 2)] {
            assert!(matches!(
                objstm.get(objnum, index),
                Err(PdfError::MalformedObject { .. })
            ));
        }
    }

    #[test]
    fn test_stream_inside_object_stream_rejected() {
        let (stream, data) = objstm(1, "7 0 ", "<</Length 2>>stream\nab\nendstream");
        let objstm = ObjectStream::parse(5, &stream, data).unwrap();
        assert!(matches!(
            objstm.get(7, 0),
            Err(PdfError::MalformedObject { .. })
        ));
    }
}
