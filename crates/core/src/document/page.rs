//! Pages: page-tree walk with attribute inheritance, content bytes, and the
//! user-to-device transform.

use super::catalog::PDFDocument;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObject};
use crate::utils::{Matrix, Rect, normalize_rect};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::warn;

/// US Letter, used when no `/MediaBox` is found anywhere up the tree.
const DEFAULT_MEDIABOX: Rect = (0.0, 0.0, 612.0, 792.0);

/// A page with its inherited attributes applied.
#[derive(Debug, Clone)]
pub struct PDFPage {
    pub objid: u32,
    /// Page dictionary including inherited keys
    pub attrs: PDFDict,
    pub mediabox: Rect,
    /// Visible region, defaults to the media box
    pub cropbox: Rect,
    /// Clockwise rotation in degrees: 0, 90, 180 or 270
    pub rotate: i64,
    pub resources: PDFDict,
}

impl PDFPage {
    pub(crate) fn from_attrs(objid: u32, attrs: PDFDict, doc: &PDFDocument) -> Result<Self> {
        let mediabox = parse_box(&attrs, "MediaBox", doc).unwrap_or_else(|| {
            warn!(objid, "page without /MediaBox, assuming US Letter");
            DEFAULT_MEDIABOX
        });
        let cropbox = parse_box(&attrs, "CropBox", doc).unwrap_or(mediabox);
        let rotate = attrs
            .get("Rotate")
            .and_then(|r| doc.resolve(r).ok())
            .and_then(|r| r.as_int().ok())
            .map(|r| r.rem_euclid(360) / 90 * 90)
            .unwrap_or(0);
        let resources = match attrs.get("Resources") {
            Some(r) => doc.resolve_dict(r).unwrap_or_default(),
            None => PDFDict::new(),
        };
        Ok(Self {
            objid,
            attrs,
            mediabox,
            cropbox,
            rotate,
            resources,
        })
    }

    /// Decoded content: a single stream or the streams of an array joined by
    /// newlines. A page without `/Contents` is empty.
    pub fn content_bytes(&self, doc: &PDFDocument) -> Result<Vec<u8>> {
        let Some(contents) = self.attrs.get("Contents") else {
            return Ok(Vec::new());
        };
        let resolved = doc.resolve_shared(contents)?;
        match resolved.as_ref() {
            PDFObject::Stream(stream) => doc.decode_stream(stream),
            PDFObject::Array(parts) => {
                let mut out = Vec::new();
                for (i, part) in parts.iter().enumerate() {
                    let part = doc.resolve_shared(part)?;
                    let PDFObject::Stream(stream) = part.as_ref() else {
                        warn!(page = self.objid, index = i, "non-stream entry in /Contents skipped");
                        continue;
                    };
                    if i > 0 {
                        out.push(b'\n');
                    }
                    out.extend(doc.decode_stream(stream)?);
                }
                Ok(out)
            }
            PDFObject::Null => Ok(Vec::new()),
            other => Err(PdfError::TypeError {
                expected: "stream or array",
                got: other.type_name(),
            }),
        }
    }

    /// Device size in points: the crop box, swapped for quarter turns.
    pub fn size(&self) -> (f64, f64) {
        let (x0, y0, x1, y1) = self.cropbox;
        let (w, h) = (x1 - x0, y1 - y0);
        if self.rotate % 180 == 90 { (h, w) } else { (w, h) }
    }

    /// Maps user space onto a device space with its origin at the top-left
    /// of the rotated crop box and y pointing down.
    pub fn device_ctm(&self) -> Matrix {
        let (x0, y0, x1, y1) = self.cropbox;
        match self.rotate {
            90 => (0.0, 1.0, 1.0, 0.0, -y0, -x0),
            180 => (-1.0, 0.0, 0.0, 1.0, x1, -y0),
            270 => (0.0, -1.0, -1.0, 0.0, y1, x1),
            _ => (1.0, 0.0, 0.0, -1.0, -x0, y1),
        }
    }
}

fn parse_box(attrs: &PDFDict, key: &str, doc: &PDFDocument) -> Option<Rect> {
    let resolved = doc.resolve(attrs.get(key)?).ok()?;
    let items = resolved.as_array().ok()?;
    let [a, b, c, d] = items.as_slice() else {
        return None;
    };
    let num = |o: &PDFObject| doc.resolve(o).ok().and_then(|v| v.as_num().ok());
    Some(normalize_rect((num(a)?, num(b)?, num(c)?, num(d)?)))
}

/// Inheritable attributes of one `/Pages` node, chained to its parent.
#[derive(Debug)]
struct InheritedNode {
    parent: Option<Arc<InheritedNode>>,
    attrs: PDFDict,
}

const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

impl InheritedNode {
    fn from_dict(parent: Option<Arc<InheritedNode>>, dict: &PDFDict) -> Arc<Self> {
        let attrs = INHERITABLE
            .iter()
            .filter_map(|&key| dict.get(key).map(|v| (key.to_string(), v.clone())))
            .collect();
        Arc::new(Self { parent, attrs })
    }

    fn lookup(&self, key: &str) -> Option<&PDFObject> {
        self.attrs
            .get(key)
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(key)))
    }

    fn apply_to(&self, dest: &mut PDFDict) {
        for key in INHERITABLE {
            if !dest.contains_key(key)
                && let Some(val) = self.lookup(key)
            {
                dest.insert(key.to_string(), val.clone());
            }
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PageRef {
    objid: u32,
    inherited: Arc<InheritedNode>,
}

/// Page objects in document order.
#[derive(Debug, Default)]
pub(crate) struct PageIndex {
    pages: Vec<PageRef>,
}

impl PageIndex {
    /// Depth-first walk of `/Pages` from the catalog. Nodes seen twice are
    /// skipped so a looping tree still terminates.
    fn build(doc: &PDFDocument) -> Self {
        let mut pages = Vec::new();
        let Some(PDFObject::Ref(root)) = doc.catalog().get("Pages") else {
            warn!("catalog has no /Pages reference");
            return Self { pages };
        };
        let mut stack = vec![(root.objid, InheritedNode::from_dict(None, &PDFDict::new()))];
        let mut visited = FxHashSet::default();

        while let Some((objid, parent)) = stack.pop() {
            if !visited.insert(objid) {
                warn!(objid, "page tree revisits a node");
                continue;
            }
            let obj = match doc.getobj(objid) {
                Ok(o) => o,
                Err(err) => {
                    warn!(objid, %err, "unreadable page tree node");
                    continue;
                }
            };
            let Ok(dict) = obj.as_dict() else {
                continue;
            };
            let is_pages = match dict.get("Type") {
                Some(PDFObject::Name(t)) => t == "Pages",
                _ => dict.contains_key("Kids"),
            };
            if is_pages {
                let inherited = InheritedNode::from_dict(Some(parent), dict);
                let kids = dict
                    .get("Kids")
                    .and_then(|k| doc.resolve(k).ok())
                    .and_then(|k| k.as_array().ok().cloned())
                    .unwrap_or_default();
                for kid in kids.iter().rev() {
                    if let PDFObject::Ref(r) = kid {
                        stack.push((r.objid, Arc::clone(&inherited)));
                    }
                }
            } else {
                pages.push(PageRef {
                    objid,
                    inherited: parent,
                });
            }
        }
        Self { pages }
    }

    pub(crate) fn len(&self) -> usize {
        self.pages.len()
    }
}

impl PDFDocument {
    fn page_index(&self) -> &PageIndex {
        self.page_index.get_or_init(|| PageIndex::build(self))
    }

    pub fn page_count(&self) -> usize {
        self.page_index().len()
    }

    /// Page `index`, counting from zero.
    pub fn page(&self, index: usize) -> Result<PDFPage> {
        let page_ref = self.page_index().pages.get(index).ok_or_else(|| {
            PdfError::InvalidArgument(format!(
                "page index {index} out of range (document has {})",
                self.page_count()
            ))
        })?;
        let obj = self.getobj(page_ref.objid)?;
        let mut attrs = obj.as_dict()?.clone();
        page_ref.inherited.apply_to(&mut attrs);
        PDFPage::from_attrs(page_ref.objid, attrs, self)
    }

    pub fn pages(&self) -> impl Iterator<Item = Result<PDFPage>> + '_ {
        (0..self.page_count()).map(move |i| self.page(i))
    }
}
