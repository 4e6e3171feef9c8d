//! Document layer - cross-reference table, object streams, pages.
//!
//! - `catalog` - PDFDocument: trailer, object resolution, stream decoding
//! - `xref` - Cross-reference table and per-object cache
//! - `objstm` - Object stream containers
//! - `page` - Page tree and page geometry
//! - `security` - Decryption hook

pub mod catalog;
pub mod objstm;
pub mod page;
pub mod security;
pub mod xref;

pub use catalog::{DEFAULT_MAX_RESOLVE_DEPTH, DocumentOptions, PDFDocument};
pub use objstm::ObjectStream;
pub use page::PDFPage;
pub use security::SecurityHandler;
pub use xref::{CrossReferenceTable, EntryKind, EntryState, XRefEntry};
