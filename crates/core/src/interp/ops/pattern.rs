//! Shading operator and pattern paints.
//!
//! Handles: sh
//!
//! Tiling pattern cells are drawn once by a nested interpreter into a
//! [`TileRenderer`](crate::interp::factory::TileRenderer) and cached by
//! pattern object number. Shading patterns and `sh` go straight to the
//! colour factory.

use crate::error::{PdfError, Result};
use crate::interp::device::MarkupHandler;
use crate::interp::interpreter::PageInterpreter;
use crate::model::{
    ClipRegion, Handle, PDFColorSpace, PDFDict, PDFObject, PDFStream, Path, WindingRule,
};
use crate::utils::{MATRIX_IDENTITY, Matrix, apply_matrix_rect, invert_matrix, mult_matrix};
use tracing::debug;

impl<'a, H: MarkupHandler + ?Sized> PageInterpreter<'a, H> {
    /// Paints a shading over its `/BBox`, or over the current clip (the
    /// page when unclipped). The fill paint of the state is left alone.
    ///
    /// PDF operator: `sh`
    pub fn do_sh(&mut self, name: &str) -> Result<()> {
        let obj = self.lookup_resource("Shading", name)?;
        let shading = self.doc.resolve(&obj)?;
        let dict = shading
            .as_dict()
            .map_err(|_| PdfError::syntax(format!("shading /{name} is not a dictionary")))?;
        let state = self.gstack.current();
        let bounds = match self.dict_rect(dict, "BBox")? {
            Some(bbox) => bbox,
            None => {
                let device = state
                    .clip
                    .as_ref()
                    .and_then(ClipRegion::bounds)
                    .unwrap_or(self.page_bounds);
                let inverse = invert_matrix(state.ctm)
                    .ok_or_else(|| PdfError::syntax("`sh` under a singular CTM"))?;
                apply_matrix_rect(inverse, device)
            }
        };
        let paint = self
            .factories
            .color
            .create_shading_paint(&shading, state.ctm, self.doc)?;
        let mut shaded = state.clone();
        shaded.fill_paint = Some(paint);
        let area = Path::from_rect(bounds);
        self.handler.fill_path(&area, WindingRule::NonZero, &shaded);
        Ok(())
    }

    /// Paint for the pattern resource `name`. `components` colour an
    /// uncoloured tiling pattern in the base space of `space`.
    pub(crate) fn pattern_paint(
        &self,
        space: &PDFColorSpace,
        name: &str,
        components: &[f64],
    ) -> Result<Option<Handle>> {
        let obj = self.lookup_resource("Pattern", name)?;
        let resolved = self.doc.resolve_shared(&obj)?;
        let dict = resolved
            .as_dict()
            .map_err(|_| PdfError::syntax(format!("pattern /{name} is not a dictionary")))?;
        let matrix = self.dict_matrix(dict, "Matrix")?.unwrap_or(MATRIX_IDENTITY);
        let device_matrix = mult_matrix(matrix, self.base_ctm);
        match self.dict_int(dict, "PatternType")?.unwrap_or(1) {
            1 => {
                let PDFObject::Stream(stream) = resolved.as_ref() else {
                    return Err(PdfError::syntax(format!("tiling pattern /{name} is not a stream")));
                };
                let tile = self.render_tile(&obj, stream, matrix)?;
                let uncolored = self.dict_int(dict, "PaintType")? == Some(2);
                let color = match &space.base {
                    Some(base) if uncolored => {
                        Some(self.factories.color.create_color(base, components))
                    }
                    _ => None,
                };
                Ok(Some(self.factories.color.create_tiling_paint(
                    &tile,
                    &stream.attrs,
                    device_matrix,
                    color,
                )))
            }
            2 => {
                let shading = dict
                    .get("Shading")
                    .ok_or_else(|| PdfError::syntax(format!("shading pattern /{name} has no /Shading")))?;
                let shading = self.doc.resolve(shading)?;
                Ok(Some(self.factories.color.create_shading_paint(
                    &shading,
                    device_matrix,
                    self.doc,
                )?))
            }
            other => Err(PdfError::syntax(format!(
                "pattern /{name} has unknown /PatternType {other}"
            ))),
        }
    }

    /// Draws one tiling pattern cell, or returns the cached tile.
    fn render_tile(&self, obj: &PDFObject, stream: &PDFStream, matrix: Matrix) -> Result<Handle> {
        let objid = match obj {
            PDFObject::Ref(r) => Some(r.objid),
            _ => stream.objid,
        };
        if let Some(tile) = objid.and_then(|id| self.resources.tile(id)) {
            return Ok(tile);
        }
        if self.depth >= self.options.max_nesting_depth {
            return Err(PdfError::syntax(format!(
                "patterns and forms nested deeper than {}",
                self.options.max_nesting_depth
            )));
        }
        let bbox = self
            .dict_rect(&stream.attrs, "BBox")?
            .ok_or_else(|| PdfError::syntax("tiling pattern without /BBox"))?;
        let resources = match stream.get("Resources") {
            Some(r) => self.doc.resolve_dict(r)?,
            None => PDFDict::new(),
        };
        let content = self.doc.decode_stream(stream)?;
        debug!(pattern = ?objid, depth = self.depth + 1, "rendering tiling pattern cell");

        let mut renderer = self
            .factories
            .color
            .create_tile_renderer(&stream.attrs, bbox, matrix);
        {
            let mut nested =
                PageInterpreter::new(self.doc, self.factories, self.resources, renderer.as_mut())
                    .with_options(self.options.clone());
            nested.depth = self.depth + 1;
            nested.render_content(content, resources, matrix, Some(bbox))?;
        }
        let tile = renderer.finish();
        Ok(match objid {
            Some(id) => self.resources.store_tile(id, tile),
            None => tile,
        })
    }
}
