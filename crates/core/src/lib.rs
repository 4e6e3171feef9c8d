//! folio - PDF object reader and content stream interpreter.
//!
//! [`PDFDocument`] opens a file, follows its cross-reference data and
//! resolves objects on demand. [`PageInterpreter`] runs a page's content
//! streams and reports what gets drawn to a [`MarkupHandler`], asking
//! pluggable [`Factories`] for paints, images and fonts along the way.

pub mod codec;
pub mod content;
pub mod document;
pub mod error;
pub mod interp;
pub mod model;
pub mod parser;
pub mod utils;

pub use document::{DocumentOptions, PDFDocument, PDFPage};
pub use error::{PdfError, Result};
pub use interp::{
    Factories, InterpreterOptions, MarkupHandler, PageInterpreter, RecordingHandler,
    ResourceManager, render_pages,
};
pub use model::{PDFDict, PDFObjRef, PDFObject, PDFStream};
