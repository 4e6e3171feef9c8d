//! Decryption hook for encrypted documents.
//!
//! Key derivation and ciphers live outside this crate; an installed
//! [`SecurityHandler`] is applied to every string and stream of objects read
//! from the file body.

use crate::model::objects::{PDFDict, PDFObject};

pub trait SecurityHandler: Send + Sync {
    fn decrypt_string(&self, objid: u32, genno: u32, data: &[u8]) -> Vec<u8>;

    fn decrypt_stream(&self, objid: u32, genno: u32, data: &[u8], attrs: &PDFDict) -> Vec<u8>;
}

/// Decrypts the strings and stream data of one indirect object.
///
/// Cross-reference streams are stored in the clear and are left alone.
pub(crate) fn decrypt_object(
    handler: &dyn SecurityHandler,
    obj: PDFObject,
    objid: u32,
    genno: u32,
) -> PDFObject {
    match obj {
        PDFObject::String(s) => PDFObject::String(handler.decrypt_string(objid, genno, &s)),
        PDFObject::Array(items) => PDFObject::Array(
            items
                .into_iter()
                .map(|item| decrypt_object(handler, item, objid, genno))
                .collect(),
        ),
        PDFObject::Dict(dict) => PDFObject::Dict(decrypt_dict(handler, dict, objid, genno)),
        PDFObject::Stream(mut stream) => {
            if stream.is_type("Type", "XRef") {
                return PDFObject::Stream(stream);
            }
            let data = handler.decrypt_stream(objid, genno, stream.get_rawdata(), &stream.attrs);
            stream.set_rawdata(data);
            stream.attrs = decrypt_dict(handler, std::mem::take(&mut stream.attrs), objid, genno);
            PDFObject::Stream(stream)
        }
        other => other,
    }
}

fn decrypt_dict(handler: &dyn SecurityHandler, dict: PDFDict, objid: u32, genno: u32) -> PDFDict {
    dict.into_iter()
        .map(|(k, v)| (k, decrypt_object(handler, v, objid, genno)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::PDFStream;

    struct Xor(u8);

    impl SecurityHandler for Xor {
        fn decrypt_string(&self, _objid: u32, _genno: u32, data: &[u8]) -> Vec<u8> {
            data.iter().map(|b| b ^ self.0).collect()
        }

        fn decrypt_stream(&self, objid: u32, genno: u32, data: &[u8], _attrs: &PDFDict) -> Vec<u8> {
            self.decrypt_string(objid, genno, data)
        }
    }

    #[test]
    fn test_nested_strings_and_streams() {
        let obj = PDFObject::Array(vec![PDFObject::String(vec![1, 2]), PDFObject::Int(3)]);
        let out = decrypt_object(&Xor(1), obj, 4, 0);
        assert_eq!(
            out,
            PDFObject::Array(vec![PDFObject::String(vec![0, 3]), PDFObject::Int(3)])
        );

        let stream = PDFObject::Stream(Box::new(PDFStream::new(PDFDict::new(), vec![0xff])));
        let out = decrypt_object(&Xor(0x0f), stream, 4, 0);
        assert_eq!(out.as_stream().unwrap().get_rawdata(), &[0xf0]);
    }
}
