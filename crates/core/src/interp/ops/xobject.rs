//! XObject, inline image and marked content operators.
//!
//! Handles: Do, BI, ID, EI, BMC, BDC, EMC, MP, DP, d0, d1
//!
//! XObjects:
//! - Do: Draw a named image, or run a form in a saved state
//!
//! Inline images:
//! - BI: Begin inline image
//! - ID: Image dictionary (abbreviated keys and values are expanded)
//! - EI: Image data
//!
//! Marked content:
//! - BMC/BDC: Begin marked content sequence (BDC with properties)
//! - EMC: End marked content sequence
//! - MP/DP: Marked content point (DP with properties)
//!
//! Type 3 glyph metrics:
//! - d0/d1: Accepted and ignored

use crate::codec::DecodedImage;
use crate::error::{PdfError, Result};
use crate::interp::device::MarkupHandler;
use crate::interp::interpreter::PageInterpreter;
use crate::model::{
    Handle, PDFColorSpace, PDFDict, PDFObject, PDFStream, Path, color::expand_colorspace_abbrev,
};
use crate::utils::{MATRIX_IDENTITY, Rect, mult_matrix};
use bytes::Bytes;
use tracing::{debug, warn};

#[allow(non_snake_case)]
impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    /// Draws a named XObject.
    ///
    /// Images are decoded once per object and cached. Forms run against
    /// their own resources in a saved graphics state. PostScript XObjects
    /// are skipped.
    ///
    /// PDF operator: `Do`
    pub fn do_Do(&mut self, name: &str) -> Result<()> {
        let obj = self.lookup_resource("XObject", name)?;
        let resolved = self.doc.resolve_shared(&obj)?;
        let PDFObject::Stream(stream) = resolved.as_ref() else {
            return Err(PdfError::syntax(format!("XObject /{name} is not a stream")));
        };
        let subtype = self.dict_value(&stream.attrs, "Subtype")?;
        match subtype.as_ref().and_then(|s| s.as_name().ok()) {
            Some("Image") => {
                let objid = match &obj {
                    PDFObject::Ref(r) => Some(r.objid),
                    _ => stream.objid,
                };
                let image = match objid {
                    Some(id) => self.resources.image(id, || self.load_image(stream))?,
                    None => self.load_image(stream)?,
                };
                self.draw_image(name, image.as_ref(), &stream.attrs)
            }
            Some("Form") => self.draw_form(name, stream),
            Some("PS") => {
                warn!(xobject = name, "PostScript XObject skipped");
                Ok(())
            }
            other => Err(PdfError::syntax(format!(
                "XObject /{name} has unknown /Subtype {}",
                other.unwrap_or("(none)")
            ))),
        }
    }

    /// PDF operator: `BI`
    pub fn do_BI(&mut self) -> Result<()> {
        self.inline_dict = None;
        Ok(())
    }

    /// Collects the inline image dictionary from the key/value operands.
    ///
    /// PDF operator: `ID`
    pub fn do_ID(&mut self, args: &[PDFObject]) -> Result<()> {
        if args.len() % 2 != 0 {
            return Err(PdfError::syntax("inline image dictionary with a key but no value"));
        }
        let mut dict = PDFDict::new();
        for pair in args.chunks_exact(2) {
            let key = pair[0].as_name().map_err(|_| {
                PdfError::syntax(format!(
                    "inline image key is a {}, not a name",
                    pair[0].type_name()
                ))
            })?;
            dict.insert(expand_inline_key(key).to_string(), expand_inline_value(&pair[1]));
        }
        self.inline_dict = Some(dict);
        Ok(())
    }

    /// Decodes and draws the inline image opened by `BI`/`ID`. Inline
    /// images are never cached.
    ///
    /// PDF operator: `EI`
    pub fn do_EI(&mut self, data: &PDFObject) -> Result<()> {
        let dict = self
            .inline_dict
            .take()
            .ok_or_else(|| PdfError::syntax("`EI` without `ID`"))?;
        let data = data
            .as_string()
            .map_err(|_| PdfError::syntax("`EI` without inline image data"))?;
        let decoded = match self.doc.pipeline(&dict).and_then(|p| p.decode_image(data)) {
            Ok(decoded) => Some(decoded),
            Err(err) if err.degrades_image() => {
                warn!(error = %err, "inline image could not be decoded");
                None
            }
            Err(err) => return Err(err),
        };
        let image = match decoded {
            Some(decoded) => self.image_from(&dict, &decoded)?,
            None => None,
        };
        self.draw_image("(inline)", image.as_ref(), &dict)
    }

    /// PDF operator: `BMC`
    pub fn do_BMC(&mut self, tag: &str) -> Result<()> {
        self.handler.begin_marked_content(tag, None);
        Ok(())
    }

    /// PDF operator: `BDC`
    pub fn do_BDC(&mut self, tag: &str, props: &PDFObject) -> Result<()> {
        let props = self.marked_content_props(props)?;
        self.handler.begin_marked_content(tag, props.as_ref());
        Ok(())
    }

    /// PDF operator: `EMC`
    pub fn do_EMC(&mut self) -> Result<()> {
        self.handler.end_marked_content();
        Ok(())
    }

    /// PDF operator: `MP`
    pub fn do_MP(&mut self, tag: &str) -> Result<()> {
        self.handler.marked_content_point(tag, None);
        Ok(())
    }

    /// PDF operator: `DP`
    pub fn do_DP(&mut self, tag: &str, props: &PDFObject) -> Result<()> {
        let props = self.marked_content_props(props)?;
        self.handler.marked_content_point(tag, props.as_ref());
        Ok(())
    }

    /// Type 3 glyph width. Glyph procedures are not run, so there is
    /// nothing to record.
    ///
    /// PDF operator: `d0`
    pub fn do_d0(&mut self, _wx: f64, _wy: f64) -> Result<()> {
        Ok(())
    }

    /// PDF operator: `d1`
    pub fn do_d1(&mut self, _wx: f64, _wy: f64, _bbox: Rect) -> Result<()> {
        Ok(())
    }

    /// Inline property dictionary, or one named in `/Properties`.
    fn marked_content_props(&self, props: &PDFObject) -> Result<Option<PDFDict>> {
        match props {
            PDFObject::Dict(dict) => Ok(Some(dict.clone())),
            PDFObject::Name(name) => match self.find_resource("Properties", name)? {
                Some(obj) => Ok(Some(self.doc.resolve_dict(&obj)?)),
                None => {
                    warn!(properties = %name, "no /Properties resource for marked content");
                    Ok(None)
                }
            },
            other => Err(PdfError::syntax(format!(
                "marked content properties must be a name or dictionary, got {}",
                other.type_name()
            ))),
        }
    }

    /// Decodes an image XObject. Images whose filters fail are skipped
    /// rather than failing the page.
    fn load_image(&self, stream: &PDFStream) -> Result<Option<Handle>> {
        let decoded = match self.doc.decode_image(stream) {
            Ok(decoded) => decoded,
            Err(err) if err.degrades_image() => {
                warn!(image = ?stream.objid, error = %err, "image could not be decoded");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        self.image_from(&stream.attrs, &decoded)
    }

    fn image_from(&self, dict: &PDFDict, decoded: &DecodedImage) -> Result<Option<Handle>> {
        let colorspace: Option<PDFColorSpace> = match dict.get("ColorSpace") {
            None => None,
            Some(PDFObject::Name(name)) => Some(self.colorspace_operand(name)?),
            Some(other) => Some(self.load_colorspace(other)?),
        };
        Ok(self.factories.image.get_image(
            dict,
            &decoded.data,
            decoded.image_filter.as_ref(),
            colorspace.as_ref(),
            self.doc,
        ))
    }

    /// Maps the image onto the unit square of user space, first row on
    /// top.
    fn draw_image(&mut self, name: &str, image: Option<&Handle>, dict: &PDFDict) -> Result<()> {
        let Some(image) = image else {
            warn!(image = name, "image skipped");
            return Ok(());
        };
        let width = self.dict_num(dict, "Width")?.unwrap_or(0.0);
        let height = self.dict_num(dict, "Height")?.unwrap_or(0.0);
        if width <= 0.0 || height <= 0.0 {
            return Err(PdfError::syntax(format!(
                "image {name} has no positive /Width and /Height"
            )));
        }
        let state = self.gstack.current();
        let transform = mult_matrix((1.0 / width, 0.0, 0.0, -1.0 / height, 0.0, 1.0), state.ctm);
        self.handler.draw_image(image, transform, state);
        Ok(())
    }

    /// Runs a form XObject. The form sees the caller's graphics state
    /// under its `/Matrix`, clipped to its `/BBox`; nothing it changes
    /// survives the call.
    fn draw_form(&mut self, name: &str, stream: &PDFStream) -> Result<()> {
        if self.depth >= self.options.max_nesting_depth {
            return Err(PdfError::syntax(format!(
                "patterns and forms nested deeper than {}",
                self.options.max_nesting_depth
            )));
        }
        let content = self.doc.decode_stream(stream)?;
        let matrix = self
            .dict_matrix(&stream.attrs, "Matrix")?
            .unwrap_or(MATRIX_IDENTITY);
        let bbox = self.dict_rect(&stream.attrs, "BBox")?;
        let resources = match stream.get("Resources") {
            Some(r) => self.doc.resolve_dict(r)?,
            None => self.resource_stack.last().cloned().unwrap_or_default(),
        };
        debug!(form = name, depth = self.depth + 1, "running form XObject");

        let saved_depth = self.gstack.depth();
        self.gstack.save();
        self.do_cm(matrix)?;
        if let Some(bbox) = bbox {
            let state = self.gstack.current();
            let device = Path::from_rect(bbox).transform(state.ctm);
            let clip = self.factories.path.intersect_clip(state.clip.as_ref(), device);
            self.set_clip(Some(clip));
        }
        let saved_base = std::mem::replace(&mut self.base_ctm, self.gstack.current().ctm);
        let saved_path = self.take_path();
        let saved_clip = self.pending_clip.take();
        self.resource_stack.push(resources);
        self.depth += 1;

        let result = self.interpret(Bytes::from(content));

        self.depth -= 1;
        self.resource_stack.pop();
        self.pending_clip = saved_clip;
        self.path = saved_path;
        self.base_ctm = saved_base;
        // A failed form may leave its own saves behind.
        while self.gstack.depth() > saved_depth + 1 {
            self.gstack.restore()?;
        }
        let restored = self.restore_state();
        result.and(restored)
    }
}

fn expand_inline_key(key: &str) -> &str {
    match key {
        "BPC" => "BitsPerComponent",
        "CS" => "ColorSpace",
        "D" => "Decode",
        "DP" => "DecodeParms",
        "F" => "Filter",
        "H" => "Height",
        "IM" => "ImageMask",
        "I" => "Interpolate",
        "W" => "Width",
        "L" => "Length",
        other => other,
    }
}

fn expand_inline_value(value: &PDFObject) -> PDFObject {
    match value {
        PDFObject::Name(name) => PDFObject::name(expand_inline_name(name)),
        PDFObject::Array(items) => PDFObject::Array(items.iter().map(expand_inline_value).collect()),
        other => other.clone(),
    }
}

fn expand_inline_name(name: &str) -> &str {
    match name {
        "AHx" => "ASCIIHexDecode",
        "A85" => "ASCII85Decode",
        "LZW" => "LZWDecode",
        "Fl" => "FlateDecode",
        "RL" => "RunLengthDecode",
        "CCF" => "CCITTFaxDecode",
        "DCT" => "DCTDecode",
        other => expand_colorspace_abbrev(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_abbreviations() {
        assert_eq!(expand_inline_key("BPC"), "BitsPerComponent");
        assert_eq!(expand_inline_key("Foo"), "Foo");
        assert_eq!(
            expand_inline_value(&PDFObject::Array(vec![
                PDFObject::name("A85"),
                PDFObject::name("Fl"),
            ])),
            PDFObject::Array(vec![
                PDFObject::name("ASCII85Decode"),
                PDFObject::name("FlateDecode"),
            ])
        );
        assert_eq!(
            expand_inline_value(&PDFObject::name("RGB")),
            PDFObject::name("DeviceRGB")
        );
        assert_eq!(expand_inline_value(&PDFObject::Int(8)), PDFObject::Int(8));
    }
}
