//! PDF Document - main entry point for reading a file.
//!
//! Handles:
//! - Cross-reference loading and the trailer (catalog, info, ID, encryption)
//! - Object resolution with per-entry caching and cycle detection
//! - Stream decoding through the filter pipeline

use super::objstm::{ObjectStream, ObjectStreamCache};
use super::page::PageIndex;
use super::security::{SecurityHandler, decrypt_object};
use super::xref::{CrossReferenceTable, EntryKind, XRefEntry};
use crate::codec::{CcittCodec, DecodedImage, FilterPipeline};
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject, PDFStream};
use crate::parser::object::PDFParser;
use bytes::Bytes;
use memmap2::Mmap;
use std::cell::RefCell;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

pub const DEFAULT_MAX_RESOLVE_DEPTH: usize = 32;

/// Options for opening a document.
#[derive(Clone)]
pub struct DocumentOptions {
    /// Bound on nested object loads and on reference chains
    pub max_resolve_depth: usize,
    pub ccitt_codec: Option<Arc<dyn CcittCodec>>,
    pub security_handler: Option<Arc<dyn SecurityHandler>>,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            max_resolve_depth: DEFAULT_MAX_RESOLVE_DEPTH,
            ccitt_codec: None,
            security_handler: None,
        }
    }
}

impl fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("max_resolve_depth", &self.max_resolve_depth)
            .field("ccitt_codec", &self.ccitt_codec.is_some())
            .field("security_handler", &self.security_handler.is_some())
            .finish()
    }
}

impl DocumentOptions {
    pub fn with_max_resolve_depth(mut self, depth: usize) -> Self {
        self.max_resolve_depth = depth.max(1);
        self
    }

    pub fn with_ccitt_codec(mut self, codec: Arc<dyn CcittCodec>) -> Self {
        self.ccitt_codec = Some(codec);
        self
    }

    pub fn with_security_handler(mut self, handler: Arc<dyn SecurityHandler>) -> Self {
        self.security_handler = Some(handler);
        self
    }
}

thread_local! {
    /// Objects being loaded on this thread, tagged with their document.
    static RESOLVING: RefCell<Vec<(usize, u32)>> = const { RefCell::new(Vec::new()) };
}

/// Marks an object as in flight on this thread until dropped.
struct ResolveGuard {
    key: (usize, u32),
}

impl ResolveGuard {
    fn enter(doc: &PDFDocument, objid: u32) -> Result<Self> {
        let key = (doc as *const PDFDocument as usize, objid);
        let limit = doc.options.max_resolve_depth;
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&key) {
                return Err(PdfError::xref(format!(
                    "reference cycle through object {objid}"
                )));
            }
            if stack.iter().filter(|(d, _)| *d == key.0).count() >= limit {
                return Err(PdfError::xref(format!(
                    "object loads nested deeper than {limit} at object {objid}"
                )));
            }
            stack.push(key);
            Ok(Self { key })
        })
    }
}

impl Drop for ResolveGuard {
    fn drop(&mut self) {
        RESOLVING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(i) = stack.iter().rposition(|k| *k == self.key) {
                stack.remove(i);
            }
        });
    }
}

/// An opened PDF file.
///
/// Owns its data via `Bytes` and is `Send + Sync`; pages may be interpreted
/// from several threads at once.
pub struct PDFDocument {
    data: Bytes,
    xref: CrossReferenceTable,
    objstms: ObjectStreamCache,
    catalog: PDFDict,
    info: Option<PDFDict>,
    encrypt_objid: Option<u32>,
    options: DocumentOptions,
    pub(crate) page_index: OnceLock<PageIndex>,
}

impl fmt::Debug for PDFDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PDFDocument")
            .field("len", &self.data.len())
            .field("xref_entries", &self.xref.len())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl PDFDocument {
    pub fn new(data: impl Into<Bytes>) -> Result<Self> {
        Self::with_options(data, DocumentOptions::default())
    }

    pub fn with_options(data: impl Into<Bytes>, options: DocumentOptions) -> Result<Self> {
        let data = data.into();
        if !data.starts_with(b"%PDF-") {
            warn!("file does not start with a %PDF- header");
        }
        let xref = CrossReferenceTable::load(&data)?;
        let encrypt_objid = match xref.trailer().get("Encrypt") {
            Some(PDFObject::Ref(r)) => Some(r.objid),
            _ => None,
        };
        let mut doc = Self {
            data,
            xref,
            objstms: ObjectStreamCache::default(),
            catalog: PDFDict::new(),
            info: None,
            encrypt_objid,
            options,
            page_index: OnceLock::new(),
        };
        if doc.is_encrypted() && doc.options.security_handler.is_none() {
            warn!("document is encrypted and no security handler is installed");
        }

        let root = doc
            .trailer()
            .get("Root")
            .cloned()
            .ok_or_else(|| PdfError::xref("trailer has no /Root"))?;
        doc.catalog = match doc.resolve(&root)? {
            PDFObject::Dict(d) => d,
            other => {
                return Err(PdfError::xref(format!(
                    "/Root resolves to {}, not a dictionary",
                    other.type_name()
                )));
            }
        };
        doc.info = match doc.trailer().get("Info").cloned() {
            Some(info) => doc.resolve(&info).ok().and_then(|i| i.as_dict().ok().cloned()),
            None => None,
        };
        debug!(objects = doc.xref.len(), "opened document");
        Ok(doc)
    }

    /// Opens a file through a read-only memory map.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, DocumentOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: DocumentOptions) -> Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only and lives as long as the Bytes owner.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::with_options(Bytes::from_owner(mmap), options)
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn options(&self) -> &DocumentOptions {
        &self.options
    }

    pub fn trailer(&self) -> &PDFDict {
        self.xref.trailer()
    }

    pub fn catalog(&self) -> &PDFDict {
        &self.catalog
    }

    pub fn info(&self) -> Option<&PDFDict> {
        self.info.as_ref()
    }

    /// The two `/ID` strings of the trailer, if present.
    pub fn file_id(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        let ids = self.resolve(self.trailer().get("ID")?).ok()?;
        match ids.as_array().ok()?.as_slice() {
            [a, b, ..] => Some((a.as_string().ok()?.to_vec(), b.as_string().ok()?.to_vec())),
            _ => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer().contains_key("Encrypt")
    }

    pub fn encrypt_dict(&self) -> Option<PDFDict> {
        let encrypt = self.trailer().get("Encrypt")?;
        self.resolve_dict(encrypt).ok()
    }

    pub fn xref(&self) -> &CrossReferenceTable {
        &self.xref
    }

    pub fn objids(&self) -> impl Iterator<Item = u32> + '_ {
        self.xref.objids()
    }

    /// Loads an indirect object by number.
    ///
    /// Free entries give null. Numbers the table does not know are
    /// `BrokenCrossReference`.
    pub fn getobj(&self, objid: u32) -> Result<Arc<PDFObject>> {
        let entry = self.xref.entry(objid).ok_or_else(|| {
            PdfError::xref(format!("object {objid} is beyond the cross-reference table"))
        })?;
        match entry.kind() {
            EntryKind::Unknown => {
                return Err(PdfError::xref(format!("object {objid} has no xref entry")));
            }
            EntryKind::Deleted => return Ok(Arc::new(PDFObject::Null)),
            EntryKind::InFile { .. } | EntryKind::Compressed { .. } => {}
        }
        if let Some(obj) = entry.cached() {
            return Ok(Arc::clone(obj));
        }
        let _guard = ResolveGuard::enter(self, objid)?;
        entry.get_or_load(|| self.load_object(objid, entry))
    }

    fn load_object(&self, objid: u32, entry: &XRefEntry) -> Result<PDFObject> {
        match entry.kind() {
            EntryKind::InFile { offset, generation } => {
                let mut parser = PDFParser::new(self.data.clone());
                let indirect = parser.parse_indirect_at(offset, &mut |r| {
                    self.getobj(r.objid).ok().and_then(|o| o.as_int().ok())
                })?;
                if indirect.objref.objid != objid {
                    return Err(PdfError::xref(format!(
                        "xref offset {offset} for object {objid} points at object {}",
                        indirect.objref.objid
                    )));
                }
                if indirect.objref.genno != generation {
                    warn!(objid, expected = generation, found = indirect.objref.genno, "generation mismatch");
                }
                let object = match &self.options.security_handler {
                    Some(handler) if self.encrypt_objid != Some(objid) => {
                        decrypt_object(handler.as_ref(), indirect.object, objid, indirect.objref.genno)
                    }
                    _ => indirect.object,
                };
                Ok(object)
            }
            EntryKind::Compressed { stream, index } => {
                let container = self.object_stream(stream)?;
                container.get(objid, index as usize)
            }
            EntryKind::Unknown | EntryKind::Deleted => Err(PdfError::xref(format!(
                "object {objid} is not stored in the file"
            ))),
        }
    }

    /// Loads and caches the decoded object stream `objid`.
    pub fn object_stream(&self, objid: u32) -> Result<Arc<ObjectStream>> {
        self.objstms.get_or_load(objid, || {
            let obj = self.getobj(objid)?;
            let stream = obj
                .as_stream()
                .map_err(|_| PdfError::xref(format!("object stream {objid} is not a stream")))?;
            let decoded = self.decode_stream(stream)?;
            ObjectStream::parse(objid, stream, decoded)
        })
    }

    /// Follows references until a direct object is reached.
    pub fn resolve(&self, obj: &PDFObject) -> Result<PDFObject> {
        Ok((*self.resolve_shared(obj)?).clone())
    }

    /// Like [`resolve`](Self::resolve) without cloning cached objects.
    pub fn resolve_shared(&self, obj: &PDFObject) -> Result<Arc<PDFObject>> {
        let PDFObject::Ref(first) = obj else {
            return Ok(Arc::new(obj.clone()));
        };
        let mut seen = vec![first.objid];
        let mut current = self.getobj(first.objid)?;
        while let PDFObject::Ref(next) = current.as_ref() {
            if seen.contains(&next.objid) {
                return Err(PdfError::xref(format!(
                    "reference cycle through object {}",
                    next.objid
                )));
            }
            if seen.len() >= self.options.max_resolve_depth {
                return Err(PdfError::xref(format!(
                    "reference chain longer than {}",
                    self.options.max_resolve_depth
                )));
            }
            seen.push(next.objid);
            current = self.getobj(next.objid)?;
        }
        Ok(current)
    }

    /// Resolves to a dictionary; a stream yields its attributes.
    pub fn resolve_dict(&self, obj: &PDFObject) -> Result<PDFDict> {
        Ok(self.resolve_shared(obj)?.as_dict()?.clone())
    }

    /// Builds the filter chain of a stream or inline image dictionary,
    /// resolving indirect `/Filter` and `/DecodeParms` values.
    pub fn pipeline(&self, dict: &PDFDict) -> Result<FilterPipeline> {
        let filter = self.resolve_elements(dict.get("Filter").or_else(|| dict.get("F")))?;
        let parms = self.resolve_elements(dict.get("DecodeParms").or_else(|| dict.get("DP")))?;
        Ok(FilterPipeline::from_objects(filter.as_ref(), parms.as_ref())?
            .with_ccitt_codec(self.options.ccitt_codec.clone()))
    }

    fn resolve_elements(&self, obj: Option<&PDFObject>) -> Result<Option<PDFObject>> {
        let Some(obj) = obj else {
            return Ok(None);
        };
        Ok(Some(match self.resolve(obj)? {
            PDFObject::Array(items) => PDFObject::Array(
                items
                    .iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<_>>()?,
            ),
            other => other,
        }))
    }

    /// Runs every filter of a stream.
    pub fn decode_stream(&self, stream: &PDFStream) -> Result<Vec<u8>> {
        self.pipeline(&stream.attrs)?.decode(stream.get_rawdata())
    }

    /// Runs a stream's filters up to its image codec.
    pub fn decode_image(&self, stream: &PDFStream) -> Result<DecodedImage> {
        self.pipeline(&stream.attrs)?.decode_image(stream.get_rawdata())
    }

    /// Forgets every decoded object, object stream and the page list. Entry
    /// kinds are kept, so the next access re-reads from the file.
    pub fn reset_cache(&mut self) {
        self.xref.reset_cache();
        self.objstms.clear();
        self.page_index.take();
    }
}
