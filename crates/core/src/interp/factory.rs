//! Factories that turn PDF resources into renderer objects.
//!
//! The interpreter never builds paints, strokes, images or fonts itself. It
//! asks these factories and forwards the opaque [`Handle`]s they return to
//! the [`MarkupHandler`](super::device::MarkupHandler).

use super::device::MarkupHandler;
use super::recorder::BasicFactories;
use crate::codec::FilterStep;
use crate::document::PDFDocument;
use crate::error::Result;
use crate::model::{
    ClipRegion, GraphicsState, Handle, PDFColorSpace, PDFDict, PDFObject, Path, WidthTable,
};
use crate::utils::{Matrix, Rect};
use std::fmt;
use std::sync::Arc;

/// Draw target of one tiling pattern cell.
pub trait TileRenderer: MarkupHandler {
    /// Ends the cell and returns the finished tile.
    fn finish(self: Box<Self>) -> Handle;
}

pub trait ColorFactory: Send + Sync {
    /// Builds a parameterised colour space such as `ICCBased`, `Indexed`,
    /// `Separation`, `DeviceN`, `CalRGB` or `Lab`. `params` are the array
    /// elements after the family name, references already resolved.
    fn create_colorspace(
        &self,
        family: &str,
        params: &[PDFObject],
        doc: &PDFDocument,
    ) -> Result<PDFColorSpace>;

    fn create_color(&self, space: &PDFColorSpace, components: &[f64]) -> Handle;

    /// Stroke style for the state's line parameters.
    fn create_stroke(&self, state: &GraphicsState) -> Handle;

    fn create_composite(
        &self,
        space: &PDFColorSpace,
        blend_mode: &str,
        alpha_is_shape: bool,
        alpha: f64,
    ) -> Handle;

    /// Target for one cell of a tiling pattern. `bbox` is in pattern space;
    /// `matrix` maps pattern space to the default space of the page.
    fn create_tile_renderer(
        &self,
        pattern: &PDFDict,
        bbox: Rect,
        matrix: Matrix,
    ) -> Box<dyn TileRenderer>;

    /// Paint repeating a finished tile. `matrix` maps pattern space to the
    /// device; `color` is set for uncoloured patterns.
    fn create_tiling_paint(
        &self,
        tile: &Handle,
        pattern: &PDFDict,
        matrix: Matrix,
        color: Option<Handle>,
    ) -> Handle;

    /// Paint for a shading dictionary or stream under `matrix`.
    fn create_shading_paint(
        &self,
        shading: &PDFObject,
        matrix: Matrix,
        doc: &PDFDocument,
    ) -> Result<Handle>;
}

pub trait PathFactory: Send + Sync {
    fn create_empty_path(&self) -> Path {
        Path::new()
    }

    fn create_stroke(&self, state: &GraphicsState) -> Handle;

    /// Intersects the current device-space clip with `next`.
    fn intersect_clip(&self, current: Option<&ClipRegion>, next: Path) -> ClipRegion {
        match current {
            Some(clip) => clip.intersect(next),
            None => ClipRegion::new(next),
        }
    }
}

pub trait ImageFactory: Send + Sync {
    /// Produces an image from data decoded up to its image codec.
    /// `image_filter` is that codec, if any. `None` skips the image.
    fn get_image(
        &self,
        dict: &PDFDict,
        data: &[u8],
        image_filter: Option<&FilterStep>,
        colorspace: Option<&PDFColorSpace>,
        doc: &PDFDocument,
    ) -> Option<Handle>;
}

pub trait FontFactory: Send + Sync {
    fn get_font(&self, dict: &PDFDict, doc: &PDFDocument, context: Option<&Handle>)
    -> Option<Handle>;

    /// Code to glyph (or Unicode) mapper for the font.
    fn get_glyph_mapper(&self, dict: &PDFDict, doc: &PDFDocument) -> Option<Handle>;

    fn get_glyph_widths(&self, dict: &PDFDict, doc: &PDFDocument) -> WidthTable;
}

/// The four factories an interpreter works with.
#[derive(Clone)]
pub struct Factories {
    pub color: Arc<dyn ColorFactory>,
    pub path: Arc<dyn PathFactory>,
    pub image: Arc<dyn ImageFactory>,
    pub font: Arc<dyn FontFactory>,
}

impl Factories {
    pub fn new(
        color: Arc<dyn ColorFactory>,
        path: Arc<dyn PathFactory>,
        image: Arc<dyn ImageFactory>,
        font: Arc<dyn FontFactory>,
    ) -> Self {
        Self {
            color,
            path,
            image,
            font,
        }
    }

    /// One object serving all four roles.
    pub fn from_shared<F>(factory: Arc<F>) -> Self
    where
        F: ColorFactory + PathFactory + ImageFactory + FontFactory + 'static,
    {
        Self {
            color: factory.clone(),
            path: factory.clone(),
            image: factory.clone(),
            font: factory,
        }
    }
}

impl Default for Factories {
    fn default() -> Self {
        Self::from_shared(Arc::new(BasicFactories::new()))
    }
}

impl fmt::Debug for Factories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factories").finish_non_exhaustive()
    }
}
