//! Cross-reference table: where each object lives, plus its decoded cache.
//!
//! Sections are read newest first by following `Prev` from the last
//! `startxref`. The first section to mention an object wins; older sections
//! only fill slots that are still unknown. The `/XRefStm` of a hybrid file
//! may also locate objects its own classic table lists as free.

use crate::codec::FilterPipeline;
use crate::error::{PdfError, Result};
use crate::model::objects::{PDFDict, PDFObjRef, PDFObject};
use crate::parser::object::PDFParser;
use crate::parser::xref::{
    XRefRecord, XRefSection, find_startxref, is_xref_table, parse_xref_stream, parse_xref_table,
};
use bytes::Bytes;
use once_cell::sync::OnceCell;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Highest object number a conforming file may use.
const MAX_OBJECT_NUMBER: u32 = 8_388_607;

/// Where an object's bytes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// No section mentions this object number
    Unknown,
    /// Free entry; the object resolves to null
    Deleted,
    InFile { offset: usize, generation: u32 },
    /// Stored at `index` inside object stream `stream`
    Compressed { stream: u32, index: u32 },
}

/// Externally visible lifecycle of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Unknown,
    Deleted,
    NotYetRead,
    Read,
    Compressed,
}

#[derive(Debug)]
pub struct XRefEntry {
    kind: EntryKind,
    cache: OnceCell<Arc<PDFObject>>,
}

impl XRefEntry {
    fn new(kind: EntryKind) -> Self {
        Self {
            kind,
            cache: OnceCell::new(),
        }
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn state(&self) -> EntryState {
        match self.kind {
            EntryKind::Unknown => EntryState::Unknown,
            EntryKind::Deleted => EntryState::Deleted,
            EntryKind::Compressed { .. } => EntryState::Compressed,
            EntryKind::InFile { .. } if self.cache.get().is_some() => EntryState::Read,
            EntryKind::InFile { .. } => EntryState::NotYetRead,
        }
    }

    pub fn cached(&self) -> Option<&Arc<PDFObject>> {
        self.cache.get()
    }

    /// Runs `load` at most once per entry; concurrent callers for the same
    /// entry wait for the first one.
    pub(crate) fn get_or_load(
        &self,
        load: impl FnOnce() -> Result<PDFObject>,
    ) -> Result<Arc<PDFObject>> {
        self.cache.get_or_try_init(|| load().map(Arc::new)).cloned()
    }
}

#[derive(Debug, Default)]
pub struct CrossReferenceTable {
    entries: Vec<XRefEntry>,
    trailer: PDFDict,
}

impl CrossReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads every section reachable from the last `startxref`.
    pub fn load(data: &Bytes) -> Result<Self> {
        let mut table = Self::new();
        let mut visited = FxHashSet::default();
        let mut next = Some(find_startxref(data)?);

        while let Some(offset) = next.take() {
            if !visited.insert(offset) {
                warn!(offset, "xref Prev chain loops back, stopping");
                break;
            }
            let section = table.read_section(data, offset)?;
            debug!(offset, entries = section.records.len(), "loaded xref section");
            next = trailer_offset(&section.trailer, "Prev");
            let hybrid = trailer_offset(&section.trailer, "XRefStm");
            let freed = table.merge_section(&section);

            if let Some(stm) = hybrid
                && visited.insert(stm)
            {
                let stream_section = table.read_section(data, stm)?;
                debug!(offset = stm, entries = stream_section.records.len(), "loaded hybrid xref stream");
                // Hybrid writers list objects only the stream can locate as
                // free in the classic table of the same update.
                table.merge_records(&stream_section.records, &freed);
            }
        }
        Ok(table)
    }

    fn read_section(&self, data: &Bytes, offset: usize) -> Result<XRefSection> {
        if offset >= data.len() {
            return Err(PdfError::xref(format!("xref offset {offset} beyond end of file")));
        }
        if is_xref_table(data, offset) {
            return parse_xref_table(data, offset);
        }
        let broken = |e: PdfError| PdfError::xref(format!("xref stream at {offset}: {e}"));
        let mut parser = PDFParser::new(data.clone());
        let object = parser
            .parse_indirect_at(offset, &mut |r| self.direct_int(data, r))
            .map_err(broken)?
            .object;
        let PDFObject::Stream(stream) = object else {
            return Err(PdfError::xref(format!("no xref table or stream at {offset}")));
        };
        if !stream.is_type("Type", "XRef") {
            return Err(PdfError::xref(format!("stream at {offset} is not /Type /XRef")));
        }
        let decoded = FilterPipeline::from_dict(&stream.attrs)
            .and_then(|p| p.decode(stream.get_rawdata()))
            .map_err(broken)?;
        parse_xref_stream(&stream.attrs, &decoded)
    }

    /// Reads a direct integer object through the entries merged so far.
    /// Used for `/Length` references while the table is still being built.
    pub(crate) fn direct_int(&self, data: &Bytes, objref: PDFObjRef) -> Option<i64> {
        let EntryKind::InFile { offset, .. } = self.entry(objref.objid)?.kind else {
            return None;
        };
        PDFParser::new(data.clone())
            .parse_indirect_at(offset, &mut |_| None)
            .ok()?
            .object
            .as_int()
            .ok()
    }

    /// Adds a section's rows and trailer keys without overwriting anything a
    /// newer section already supplied.
    pub fn merge(&mut self, section: &XRefSection) {
        self.merge_section(section);
    }

    /// Like [`merge`](Self::merge), returning the slots this section freed.
    fn merge_section(&mut self, section: &XRefSection) -> FxHashSet<u32> {
        let freed = self.merge_records(&section.records, &FxHashSet::default());
        for (key, value) in &section.trailer {
            if !self.trailer.contains_key(key) {
                self.trailer.insert(key.clone(), value.clone());
            }
        }
        freed
    }

    /// Fills unknown slots from `records`. Slots in `replaceable` that are
    /// currently free may also be taken by an in-use or compressed record.
    fn merge_records(
        &mut self,
        records: &[(u32, XRefRecord)],
        replaceable: &FxHashSet<u32>,
    ) -> FxHashSet<u32> {
        let mut freed = FxHashSet::default();
        for &(objid, record) in records {
            if objid > MAX_OBJECT_NUMBER {
                warn!(objid, "xref entry beyond the object number limit ignored");
                continue;
            }
            let slot = objid as usize;
            if slot >= self.entries.len() {
                self.entries
                    .resize_with(slot + 1, || XRefEntry::new(EntryKind::Unknown));
            }
            let replace = match self.entries[slot].kind {
                EntryKind::Unknown => true,
                EntryKind::Deleted => {
                    replaceable.contains(&objid) && !matches!(record, XRefRecord::Free { .. })
                }
                _ => false,
            };
            if !replace {
                continue;
            }
            let kind = match record {
                XRefRecord::Free { .. } => {
                    freed.insert(objid);
                    EntryKind::Deleted
                }
                XRefRecord::InUse { offset, generation } => EntryKind::InFile { offset, generation },
                XRefRecord::Compressed { stream, index } => EntryKind::Compressed { stream, index },
            };
            self.entries[slot] = XRefEntry::new(kind);
        }
        freed
    }

    /// The merged trailer; keys come from the newest section that has them.
    pub fn trailer(&self) -> &PDFDict {
        &self.trailer
    }

    /// Number of slots, i.e. one past the highest object number seen.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, objid: u32) -> Option<&XRefEntry> {
        self.entries.get(objid as usize)
    }

    pub fn state(&self, objid: u32) -> EntryState {
        self.entry(objid).map_or(EntryState::Unknown, XRefEntry::state)
    }

    /// Object numbers that refer to stored objects.
    pub fn objids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            matches!(
                e.kind,
                EntryKind::InFile { .. } | EntryKind::Compressed { .. }
            )
            .then_some(i as u32)
        })
    }

    /// Drops every decoded object; entry kinds are untouched.
    pub fn reset_cache(&mut self) {
        for entry in &mut self.entries {
            entry.cache.take();
        }
    }
}

fn trailer_offset(trailer: &PDFDict, key: &str) -> Option<usize> {
    trailer
        .get(key)
        .and_then(|v| v.as_int().ok())
        .and_then(|n| usize::try_from(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(records: Vec<(u32, XRefRecord)>) -> XRefSection {
        XRefSection {
            records,
            trailer: PDFDict::new(),
        }
    }

    #[test]
    fn test_first_write_sticks() {
        let mut table = CrossReferenceTable::new();
        table.merge(&section(vec![(
            3,
            XRefRecord::InUse {
                offset: 500,
                generation: 0,
            },
        )]));
        table.merge(&section(vec![
            (
                3,
                XRefRecord::InUse {
                    offset: 100,
                    generation: 0,
                },
            ),
            (1, XRefRecord::Free { generation: 1 }),
        ]));
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.entry(3).map(XRefEntry::kind),
            Some(EntryKind::InFile {
                offset: 500,
                generation: 0
            })
        );
        assert_eq!(table.state(1), EntryState::Deleted);
        assert_eq!(table.state(2), EntryState::Unknown);
        assert_eq!(table.state(99), EntryState::Unknown);
        assert_eq!(table.objids().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_hybrid_stream_fills_slots_its_classic_table_freed() {
        let mut table = CrossReferenceTable::new();
        // A newer update deleted object 8 for good.
        table.merge(&section(vec![(8, XRefRecord::Free { generation: 1 })]));
        let freed = table.merge_section(&section(vec![
            (5, XRefRecord::Free { generation: 0 }),
            (6, XRefRecord::InUse { offset: 40, generation: 0 }),
            (8, XRefRecord::Free { generation: 0 }),
        ]));
        assert!(freed.contains(&5));
        assert!(!freed.contains(&8));
        table.merge_records(
            &[
                (5, XRefRecord::Compressed { stream: 7, index: 0 }),
                (6, XRefRecord::InUse { offset: 999, generation: 0 }),
                (8, XRefRecord::Compressed { stream: 7, index: 1 }),
            ],
            &freed,
        );
        assert_eq!(
            table.entry(5).map(XRefEntry::kind),
            Some(EntryKind::Compressed { stream: 7, index: 0 })
        );
        assert_eq!(
            table.entry(6).map(XRefEntry::kind),
            Some(EntryKind::InFile { offset: 40, generation: 0 })
        );
        assert_eq!(table.state(8), EntryState::Deleted);
    }

    #[test]
    fn test_newest_trailer_keys_win() {
        let mut table = CrossReferenceTable::new();
        let mut newer = PDFDict::new();
        newer.insert("Root".into(), PDFObject::Ref(PDFObjRef::new(9, 0)));
        let mut older = PDFDict::new();
        older.insert("Root".into(), PDFObject::Ref(PDFObjRef::new(1, 0)));
        older.insert("Info".into(), PDFObject::Ref(PDFObjRef::new(2, 0)));
        table.merge(&XRefSection {
            records: vec![],
            trailer: newer,
        });
        table.merge(&XRefSection {
            records: vec![],
            trailer: older,
        });
        assert_eq!(
            table.trailer().get("Root"),
            Some(&PDFObject::Ref(PDFObjRef::new(9, 0)))
        );
        assert!(table.trailer().contains_key("Info"));
    }

    #[test]
    fn test_reset_cache_keeps_kinds() {
        let mut table = CrossReferenceTable::new();
        table.merge(&section(vec![(
            1,
            XRefRecord::InUse {
                offset: 0,
                generation: 0,
            },
        )]));
        let entry = table.entry(1).unwrap();
        entry.get_or_load(|| Ok(PDFObject::Int(7))).unwrap();
        assert_eq!(table.state(1), EntryState::Read);
        table.reset_cache();
        assert_eq!(table.state(1), EntryState::NotYetRead);
    }
}
