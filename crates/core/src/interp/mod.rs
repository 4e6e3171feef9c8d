//! Content stream interpretation.
//!
//! This module contains:
//! - `interpreter`: the page interpreter and its operand/operator loop
//! - `ops`: operator implementations by category
//! - `device`: the [`MarkupHandler`] trait that receives draw calls
//! - `factory`: factories that turn resources into renderer handles
//! - `resources`: caches shared between interpreters
//! - `recorder`: plain-data factories and a recording handler

pub mod device;
pub mod factory;
pub mod interpreter;
pub mod ops;
pub mod recorder;
pub mod resources;

pub use device::{GLYPH_FLIP, GlyphRun, MarkupHandler};
pub use factory::{
    ColorFactory, Factories, FontFactory, ImageFactory, PathFactory, TileRenderer,
};
pub use interpreter::{
    CancelToken, CompatMode, DEFAULT_MAX_NESTING_DEPTH, InterpreterOptions, PageInterpreter,
    render_pages,
};
pub use recorder::{BasicFactories, DrawCall, PaintDesc, RecordingHandler};
pub use resources::{ResourceKey, ResourceManager};
