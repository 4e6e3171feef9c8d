//! Plain-data factories and a handler that records draw calls.
//!
//! [`BasicFactories`] backs [`Factories::default`](super::factory::Factories):
//! paints, strokes, images and fonts become small descriptive structs.
//! [`RecordingHandler`] keeps what a page draws as a list of [`DrawCall`]s
//! in device space.

use super::device::{GlyphRun, MarkupHandler};
use super::factory::{ColorFactory, FontFactory, ImageFactory, PathFactory, TileRenderer};
use crate::codec::FilterStep;
use crate::document::PDFDocument;
use crate::error::{PdfError, Result};
use crate::model::{
    ClipRegion, GraphicsState, Handle, PDFColorSpace, PDFDict, PDFObject, Path, WidthTable,
    WindingRule,
};
use crate::utils::{Matrix, Point, Rect, apply_matrix_pt, matrix2str};
use std::fmt;
use std::sync::Arc;

/// Paint for a colour in a non-pattern space.
#[derive(Debug, Clone, PartialEq)]
pub struct SolidColor {
    pub space: String,
    pub components: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub line_width: f64,
    pub line_cap: i64,
    pub line_join: i64,
    pub miter_limit: f64,
    pub dash: (Vec<f64>, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub space: String,
    pub blend_mode: String,
    pub alpha_is_shape: bool,
    pub alpha: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    pub width: i64,
    pub height: i64,
    pub bits_per_component: i64,
    pub colorspace: Option<String>,
    pub image_mask: bool,
    /// Image codec left undecoded, such as `DCTDecode`
    pub filter: Option<&'static str>,
    pub data_len: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontInfo {
    pub base_font: String,
    pub subtype: String,
}

/// Draw calls of one tiling pattern cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordedTile {
    pub calls: Vec<DrawCall>,
}

#[derive(Clone)]
pub struct TilingPaint {
    pub tile: Handle,
    pub matrix: Matrix,
    pub paint_type: i64,
    /// Colour of an uncoloured pattern
    pub color: Option<Handle>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShadingPaint {
    pub shading_type: i64,
    pub matrix: Matrix,
}

/// Factories producing the plain structs above. Colour spaces with
/// parameters only get their component counts worked out.
#[derive(Debug, Clone, Default)]
pub struct BasicFactories;

impl BasicFactories {
    pub fn new() -> Self {
        Self
    }
}

fn resolved(dict: &PDFDict, key: &str, doc: &PDFDocument) -> Option<PDFObject> {
    dict.get(key).and_then(|v| doc.resolve(v).ok())
}

fn resolved_int(dict: &PDFDict, key: &str, doc: &PDFDocument) -> Option<i64> {
    resolved(dict, key, doc).and_then(|v| v.as_int().ok())
}

fn resolved_num(dict: &PDFDict, key: &str, doc: &PDFDocument) -> Option<f64> {
    resolved(dict, key, doc).and_then(|v| v.as_num().ok())
}

fn dict_of(obj: &PDFObject) -> Option<&PDFDict> {
    match obj {
        PDFObject::Dict(dict) => Some(dict),
        PDFObject::Stream(stream) => Some(&stream.attrs),
        _ => None,
    }
}

impl ColorFactory for BasicFactories {
    fn create_colorspace(
        &self,
        family: &str,
        params: &[PDFObject],
        doc: &PDFDocument,
    ) -> Result<PDFColorSpace> {
        let ncomponents = match family {
            "ICCBased" => params
                .first()
                .and_then(dict_of)
                .and_then(|dict| resolved_int(dict, "N", doc))
                .filter(|n| matches!(n, 1 | 3 | 4))
                .ok_or_else(|| PdfError::syntax("ICCBased colour space without a valid /N"))?
                as usize,
            "Indexed" | "Separation" | "CalGray" => 1,
            "CalRGB" | "Lab" => 3,
            "DeviceN" => match params.first() {
                Some(PDFObject::Array(names)) if !names.is_empty() => names.len(),
                _ => return Err(PdfError::syntax("DeviceN colour space without colorant names")),
            },
            other => return Err(PdfError::syntax(format!("unknown colour space family /{other}"))),
        };
        Ok(PDFColorSpace::new(family, ncomponents))
    }

    fn create_color(&self, space: &PDFColorSpace, components: &[f64]) -> Handle {
        Arc::new(SolidColor {
            space: space.name.clone(),
            components: components.to_vec(),
        })
    }

    fn create_stroke(&self, state: &GraphicsState) -> Handle {
        PathFactory::create_stroke(self, state)
    }

    fn create_composite(
        &self,
        space: &PDFColorSpace,
        blend_mode: &str,
        alpha_is_shape: bool,
        alpha: f64,
    ) -> Handle {
        Arc::new(Composite {
            space: space.name.clone(),
            blend_mode: blend_mode.to_string(),
            alpha_is_shape,
            alpha,
        })
    }

    fn create_tile_renderer(
        &self,
        _pattern: &PDFDict,
        _bbox: Rect,
        _matrix: Matrix,
    ) -> Box<dyn TileRenderer> {
        Box::new(RecordingHandler::new())
    }

    fn create_tiling_paint(
        &self,
        tile: &Handle,
        pattern: &PDFDict,
        matrix: Matrix,
        color: Option<Handle>,
    ) -> Handle {
        let paint_type = match pattern.get("PaintType") {
            Some(PDFObject::Int(n)) => *n,
            _ => 1,
        };
        Arc::new(TilingPaint {
            tile: tile.clone(),
            matrix,
            paint_type,
            color,
        })
    }

    fn create_shading_paint(
        &self,
        shading: &PDFObject,
        matrix: Matrix,
        doc: &PDFDocument,
    ) -> Result<Handle> {
        let dict = dict_of(shading).ok_or_else(|| PdfError::syntax("shading is not a dictionary"))?;
        let shading_type = resolved_int(dict, "ShadingType", doc)
            .filter(|t| (1..=7).contains(t))
            .ok_or_else(|| PdfError::syntax("shading without a valid /ShadingType"))?;
        Ok(Arc::new(ShadingPaint {
            shading_type,
            matrix,
        }))
    }
}

impl PathFactory for BasicFactories {
    fn create_stroke(&self, state: &GraphicsState) -> Handle {
        Arc::new(StrokeStyle {
            line_width: state.line_width,
            line_cap: state.line_cap,
            line_join: state.line_join,
            miter_limit: state.miter_limit,
            dash: state.dash.clone(),
        })
    }
}

impl ImageFactory for BasicFactories {
    fn get_image(
        &self,
        dict: &PDFDict,
        data: &[u8],
        image_filter: Option<&FilterStep>,
        colorspace: Option<&PDFColorSpace>,
        doc: &PDFDocument,
    ) -> Option<Handle> {
        let image_mask = matches!(resolved(dict, "ImageMask", doc), Some(PDFObject::Bool(true)));
        Some(Arc::new(ImageInfo {
            width: resolved_int(dict, "Width", doc)?,
            height: resolved_int(dict, "Height", doc)?,
            bits_per_component: resolved_int(dict, "BitsPerComponent", doc)
                .unwrap_or(if image_mask { 1 } else { 8 }),
            colorspace: colorspace.map(|cs| cs.name.clone()),
            image_mask,
            filter: image_filter.map(|step| step.filter.name()),
            data_len: data.len(),
        }))
    }
}

impl FontFactory for BasicFactories {
    fn get_font(
        &self,
        dict: &PDFDict,
        doc: &PDFDocument,
        _context: Option<&Handle>,
    ) -> Option<Handle> {
        let name = |key: &str| match resolved(dict, key, doc) {
            Some(PDFObject::Name(n)) => n,
            _ => String::new(),
        };
        Some(Arc::new(FontInfo {
            base_font: name("BaseFont"),
            subtype: name("Subtype"),
        }))
    }

    fn get_glyph_mapper(&self, _dict: &PDFDict, _doc: &PDFDocument) -> Option<Handle> {
        None
    }

    /// Simple fonts read `/FirstChar` and `/Widths`; composite fonts read
    /// `/DW` and `/W` of their descendant and use two-byte codes. Type 3
    /// widths are in glyph space and get scaled by the font matrix.
    fn get_glyph_widths(&self, dict: &PDFDict, doc: &PDFDocument) -> WidthTable {
        let subtype = resolved(dict, "Subtype", doc);
        if matches!(&subtype, Some(PDFObject::Name(n)) if n == "Type0") {
            let descendant = resolved(dict, "DescendantFonts", doc)
                .and_then(|fonts| fonts.as_array().ok()?.first().cloned())
                .and_then(|font| doc.resolve_dict(&font).ok())
                .unwrap_or_default();
            return cid_widths(&descendant, doc);
        }

        let scale = match &subtype {
            Some(PDFObject::Name(n)) if n == "Type3" => resolved(dict, "FontMatrix", doc)
                .and_then(|m| m.as_numbers().ok())
                .and_then(|m| m.first().copied())
                .map_or(1.0, |a| a * 1000.0),
            _ => 1.0,
        };
        let missing = resolved(dict, "FontDescriptor", doc)
            .and_then(|fd| fd.as_dict().ok().and_then(|fd| resolved_num(fd, "MissingWidth", doc)))
            .unwrap_or(0.0);
        let mut table = WidthTable::new(1, missing * scale);
        let first = resolved_int(dict, "FirstChar", doc).unwrap_or(0).max(0) as u32;
        if let Some(PDFObject::Array(widths)) = resolved(dict, "Widths", doc) {
            for (i, width) in widths.iter().enumerate() {
                if let Ok(w) = doc.resolve(width).and_then(|w| w.as_num()) {
                    table.set(first + i as u32, w * scale);
                }
            }
        }
        table
    }
}

/// `/W` holds runs `c [w1 w2 ...]` and ranges `c_first c_last w`.
fn cid_widths(descendant: &PDFDict, doc: &PDFDocument) -> WidthTable {
    let mut table = WidthTable::new(2, resolved_num(descendant, "DW", doc).unwrap_or(1000.0));
    let Some(PDFObject::Array(entries)) = resolved(descendant, "W", doc) else {
        return table;
    };
    let entries: Vec<PDFObject> = entries
        .iter()
        .filter_map(|e| doc.resolve(e).ok())
        .collect();
    let mut i = 0;
    while i + 1 < entries.len() {
        let Ok(start) = entries[i].as_int() else {
            break;
        };
        match &entries[i + 1] {
            PDFObject::Array(run) => {
                for (offset, width) in run.iter().enumerate() {
                    if let Ok(w) = width.as_num() {
                        table.set(start as u32 + offset as u32, w);
                    }
                }
                i += 2;
            }
            last => {
                let (Ok(last), Some(Ok(w))) = (last.as_int(), entries.get(i + 2).map(|w| w.as_num()))
                else {
                    break;
                };
                for code in start..=last {
                    table.set(code as u32, w);
                }
                i += 3;
            }
        }
    }
    table
}

/// Paint as seen by a [`RecordingHandler`].
#[derive(Debug, Clone, PartialEq)]
pub enum PaintDesc {
    None,
    Solid { space: String, components: Vec<f64> },
    Tiling { paint_type: i64, calls: usize },
    Shading { shading_type: i64 },
    Other,
}

impl PaintDesc {
    pub fn of(handle: Option<&Handle>) -> Self {
        let Some(handle) = handle else {
            return Self::None;
        };
        if let Some(color) = handle.downcast_ref::<SolidColor>() {
            Self::Solid {
                space: color.space.clone(),
                components: color.components.clone(),
            }
        } else if let Some(paint) = handle.downcast_ref::<TilingPaint>() {
            Self::Tiling {
                paint_type: paint.paint_type,
                calls: paint
                    .tile
                    .downcast_ref::<RecordedTile>()
                    .map_or(0, |tile| tile.calls.len()),
            }
        } else if let Some(paint) = handle.downcast_ref::<ShadingPaint>() {
            Self::Shading {
                shading_type: paint.shading_type,
            }
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for PaintDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Solid { space, components } => {
                write!(f, "{space}(")?;
                for (i, c) in components.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{c}")?;
                }
                write!(f, ")")
            }
            Self::Tiling { paint_type, calls } => write!(f, "tiling{paint_type}[{calls}]"),
            Self::Shading { shading_type } => write!(f, "shading{shading_type}"),
            Self::Other => write!(f, "other"),
        }
    }
}

/// One recorded handler call. Geometry is in device space.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    BeginPage {
        width: f64,
        height: f64,
    },
    EndPage,
    Fill {
        path: Path,
        rule: WindingRule,
        paint: PaintDesc,
        alpha: f64,
    },
    Stroke {
        path: Path,
        paint: PaintDesc,
        line_width: f64,
    },
    Clip {
        bounds: Option<Rect>,
    },
    Image {
        transform: Matrix,
        info: Option<ImageInfo>,
    },
    Text {
        font: String,
        size: f64,
        codes: Vec<u32>,
        /// Device position of the first glyph origin
        origin: Point,
        advance: f64,
        paint: PaintDesc,
    },
    BeginMarkedContent {
        tag: String,
        props: Option<PDFDict>,
    },
    EndMarkedContent,
    MarkedContentPoint {
        tag: String,
        props: Option<PDFDict>,
    },
}

fn fmt_rect(r: Rect) -> String {
    format!("{:.2},{:.2},{:.2},{:.2}", r.0, r.1, r.2, r.3)
}

impl fmt::Display for DrawCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeginPage { width, height } => write!(f, "begin_page {width}x{height}"),
            Self::EndPage => write!(f, "end_page"),
            Self::Fill {
                path, rule, paint, ..
            } => {
                let rule = match rule {
                    WindingRule::NonZero => "nonzero",
                    WindingRule::EvenOdd => "evenodd",
                };
                write!(f, "fill {rule} {paint}")?;
                if let Some(b) = path.bounds() {
                    write!(f, " [{}]", fmt_rect(b))?;
                }
                Ok(())
            }
            Self::Stroke {
                path,
                paint,
                line_width,
            } => {
                write!(f, "stroke w={line_width} {paint}")?;
                if let Some(b) = path.bounds() {
                    write!(f, " [{}]", fmt_rect(b))?;
                }
                Ok(())
            }
            Self::Clip { bounds: Some(b) } => write!(f, "clip [{}]", fmt_rect(*b)),
            Self::Clip { bounds: None } => write!(f, "clip none"),
            Self::Image { transform, info } => {
                write!(f, "image {}", matrix2str(*transform))?;
                if let Some(info) = info {
                    write!(f, " {}x{}", info.width, info.height)?;
                }
                Ok(())
            }
            Self::Text {
                font,
                size,
                codes,
                origin,
                ..
            } => write!(
                f,
                "text {font} {size} at {:.2},{:.2} {:?}",
                origin.0, origin.1, codes
            ),
            Self::BeginMarkedContent { tag, .. } => write!(f, "begin_marked {tag}"),
            Self::EndMarkedContent => write!(f, "end_marked"),
            Self::MarkedContentPoint { tag, .. } => write!(f, "mark {tag}"),
        }
    }
}

/// Handler that records every call in device space.
#[derive(Debug, Clone, Default)]
pub struct RecordingHandler {
    pub calls: Vec<DrawCall>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// One line per call, as printed by `Display`.
    pub fn summary(&self) -> String {
        self.calls
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl MarkupHandler for RecordingHandler {
    fn begin_page(&mut self, width: f64, height: f64) {
        self.calls.push(DrawCall::BeginPage { width, height });
    }

    fn end_page(&mut self) {
        self.calls.push(DrawCall::EndPage);
    }

    fn stroke_path(&mut self, path: &Path, state: &GraphicsState) {
        self.calls.push(DrawCall::Stroke {
            path: path.transform(state.ctm),
            paint: PaintDesc::of(state.stroke_paint.as_ref()),
            line_width: state.line_width,
        });
    }

    fn fill_path(&mut self, path: &Path, rule: WindingRule, state: &GraphicsState) {
        self.calls.push(DrawCall::Fill {
            path: path.transform(state.ctm),
            rule,
            paint: PaintDesc::of(state.fill_paint.as_ref()),
            alpha: state.fill_alpha,
        });
    }

    fn clip_changed(&mut self, clip: Option<&ClipRegion>) {
        self.calls.push(DrawCall::Clip {
            bounds: clip.and_then(ClipRegion::bounds),
        });
    }

    fn draw_image(&mut self, image: &Handle, transform: Matrix, _state: &GraphicsState) {
        self.calls.push(DrawCall::Image {
            transform,
            info: image.downcast_ref::<ImageInfo>().cloned(),
        });
    }

    fn show_text(&mut self, run: &GlyphRun, state: &GraphicsState) {
        self.calls.push(DrawCall::Text {
            font: run.font.base_font.clone(),
            size: run.font_size,
            codes: run.codes.clone(),
            origin: apply_matrix_pt(run.matrix, (0.0, 0.0)),
            advance: run.advance,
            paint: PaintDesc::of(state.fill_paint.as_ref()),
        });
    }

    fn begin_marked_content(&mut self, tag: &str, props: Option<&PDFDict>) {
        self.calls.push(DrawCall::BeginMarkedContent {
            tag: tag.to_string(),
            props: props.cloned(),
        });
    }

    fn end_marked_content(&mut self) {
        self.calls.push(DrawCall::EndMarkedContent);
    }

    fn marked_content_point(&mut self, tag: &str, props: Option<&PDFDict>) {
        self.calls.push(DrawCall::MarkedContentPoint {
            tag: tag.to_string(),
            props: props.cloned(),
        });
    }
}

impl TileRenderer for RecordingHandler {
    fn finish(self: Box<Self>) -> Handle {
        Arc::new(RecordedTile { calls: self.calls })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_desc_from_handles() {
        let factories = BasicFactories::new();
        let red = factories.create_color(&PDFColorSpace::device_rgb(), &[1.0, 0.0, 0.0]);
        assert_eq!(
            PaintDesc::of(Some(&red)),
            PaintDesc::Solid {
                space: "DeviceRGB".into(),
                components: vec![1.0, 0.0, 0.0],
            }
        );
        assert_eq!(PaintDesc::of(Some(&red)).to_string(), "DeviceRGB(1 0 0)");
        assert_eq!(PaintDesc::of(None), PaintDesc::None);
        let stroke = PathFactory::create_stroke(&factories, &GraphicsState::default());
        assert_eq!(PaintDesc::of(Some(&stroke)), PaintDesc::Other);
    }

    #[test]
    fn test_tile_keeps_recorded_calls() {
        let mut tile = RecordingHandler::new();
        tile.end_page();
        let handle = Box::new(tile).finish();
        let paint = BasicFactories::new().create_tiling_paint(
            &handle,
            &PDFDict::new(),
            crate::utils::MATRIX_IDENTITY,
            None,
        );
        assert_eq!(
            PaintDesc::of(Some(&paint)),
            PaintDesc::Tiling {
                paint_type: 1,
                calls: 1
            }
        );
    }
}
