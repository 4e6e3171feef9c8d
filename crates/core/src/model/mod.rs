//! PDF model types - objects, graphics state, paths and colour spaces.
//!
//! - `objects` - PDF object types (PDFObject, PDFStream, PDFObjRef)
//! - `state` - Graphics state and its save/restore stack
//! - `path` - Path accumulator and clip regions
//! - `color` - Colour space and colour values
//! - `font` - Loaded fonts and width tables

pub mod color;
pub mod font;
pub mod objects;
pub mod path;
pub mod state;

use std::any::Any;
use std::sync::Arc;

/// Opaque object produced by an external factory. The interpreter stores and
/// forwards handles but never looks inside them.
pub type Handle = Arc<dyn Any + Send + Sync>;

pub use color::{Color, PDFColorSpace};
pub use font::{LoadedFont, WidthTable};
pub use objects::{PDFDict, PDFObjRef, PDFObject, PDFStream};
pub use path::{ClipRegion, Path, PathSegment, WindingRule};
pub use state::{GraphicsStack, GraphicsState};
