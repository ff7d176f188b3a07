//! The revlog index: a fixed-record array mapping revision numbers to nodes
//! and to the location of their data.

use std::collections::HashMap;

use byteorder::BigEndian;
use byteorder::ByteOrder;

use super::node::Node;
use super::BaseRevision;
use super::Graph;
use super::GraphError;
use super::Revision;
use super::UncheckedRevision;
use super::NULL_REVISION;
use crate::errors::RevlogError;

/// Byte length of an index record on disk.
pub const INDEX_ENTRY_SIZE: usize = 48;

/// One index record.
///
/// On disk (all big-endian): `offset << 16 | flags` as u64, compressed
/// length as i32, delta base revision, link revision, the two parent
/// revisions, then the 20 node bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEntry {
    /// Start of this revision's data in the data file.
    pub offset: u64,
    /// Reserved for per-revision storage flags, always zero for now.
    pub flags: u16,
    /// Stored (possibly compressed) length of the data.
    pub compressed_len: u32,
    /// Delta base; equals the entry's own revision for full texts.
    pub base: Revision,
    /// Cross-reference into the changelog that introduced this revision.
    pub link: BaseRevision,
    pub p1: Revision,
    pub p2: Revision,
    pub node: Node,
}

impl IndexEntry {
    pub fn is_full_text(&self, own_rev: Revision) -> bool {
        self.base == own_rev
    }

    fn pack(&self) -> [u8; INDEX_ENTRY_SIZE] {
        let mut bytes = [0u8; INDEX_ENTRY_SIZE];
        BigEndian::write_u64(
            &mut bytes[0..8],
            self.offset << 16 | self.flags as u64,
        );
        BigEndian::write_u32(&mut bytes[8..12], self.compressed_len);
        BigEndian::write_i32(&mut bytes[12..16], self.base.0);
        BigEndian::write_i32(&mut bytes[16..20], self.link);
        BigEndian::write_i32(&mut bytes[20..24], self.p1.0);
        BigEndian::write_i32(&mut bytes[24..28], self.p2.0);
        bytes[28..48].copy_from_slice(self.node.as_bytes());
        bytes
    }
}

/// The in-memory index, fully loaded.
///
/// Loading everything eagerly is a deliberate policy: lazy chunked loading
/// is a performance concern for histories far larger than this engine's
/// callers have, and the format does not require it.
#[derive(Debug, Default)]
pub struct Index {
    entries: Vec<IndexEntry>,
    /// Rebuildable map from node to revision number, owned by the index and
    /// kept in sync by `append`/`truncate`.
    nodemap: HashMap<Node, Revision>,
}

impl Index {
    /// Parse a whole index file.
    pub fn parse(bytes: &[u8]) -> Result<Self, RevlogError> {
        if bytes.len() % INDEX_ENTRY_SIZE != 0 {
            return Err(RevlogError::corrupted(
                "index size is not a multiple of the record size",
            ));
        }
        let mut index = Index {
            entries: Vec::with_capacity(bytes.len() / INDEX_ENTRY_SIZE),
            nodemap: HashMap::with_capacity(bytes.len() / INDEX_ENTRY_SIZE),
        };
        for record in bytes.chunks_exact(INDEX_ENTRY_SIZE) {
            let rev = Revision(index.entries.len() as BaseRevision);
            let entry = unpack_record(record, rev, &index)?;
            index.nodemap.insert(entry.node, rev);
            index.entries.push(entry);
        }
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, rev: Revision) -> Option<&IndexEntry> {
        if rev == NULL_REVISION {
            return None;
        }
        self.entries.get(rev.0 as usize)
    }

    /// Return a [`Revision`] if `rev` is a valid revision number for this
    /// index. [`NULL_REVISION`] is considered to be valid.
    pub fn check_revision(&self, rev: UncheckedRevision) -> Option<Revision> {
        let rev = rev.0;
        if rev == NULL_REVISION.0
            || (rev >= 0 && (rev as usize) < self.len())
        {
            Some(Revision(rev))
        } else {
            None
        }
    }

    pub fn rev_from_node(&self, node: &Node) -> Option<Revision> {
        if node.is_null() {
            return Some(NULL_REVISION);
        }
        self.nodemap.get(node).copied()
    }

    pub fn has_node(&self, node: &Node) -> bool {
        self.rev_from_node(node).is_some()
    }

    /// Append a record, returning its revision number and the on-disk bytes
    /// the caller must write at the end of the index file.
    pub fn append(
        &mut self,
        entry: IndexEntry,
    ) -> (Revision, [u8; INDEX_ENTRY_SIZE]) {
        let rev = Revision(self.entries.len() as BaseRevision);
        let bytes = entry.pack();
        self.nodemap.insert(entry.node, rev);
        self.entries.push(entry);
        (rev, bytes)
    }

    /// Drop every record from `rev` (included) onward.
    pub fn truncate(&mut self, rev: Revision) {
        if rev == NULL_REVISION || rev.0 as usize >= self.len() {
            return;
        }
        for entry in &self.entries[rev.0 as usize..] {
            self.nodemap.remove(&entry.node);
        }
        self.entries.truncate(rev.0 as usize);
    }

    pub fn node(&self, rev: Revision) -> Option<&Node> {
        self.entry(rev).map(|entry| &entry.node)
    }
}

impl Graph for Index {
    fn parents(&self, rev: Revision) -> Result<[Revision; 2], GraphError> {
        let entry =
            self.entry(rev).ok_or(GraphError::ParentOutOfRange(rev))?;
        Ok([entry.p1, entry.p2])
    }
}

fn unpack_record(
    record: &[u8],
    rev: Revision,
    index: &Index,
) -> Result<IndexEntry, RevlogError> {
    let offset_flags = BigEndian::read_u64(&record[0..8]);
    let compressed_len = BigEndian::read_u32(&record[8..12]);
    let base = BigEndian::read_i32(&record[12..16]);
    let link = BigEndian::read_i32(&record[16..20]);
    let p1 = BigEndian::read_i32(&record[20..24]);
    let p2 = BigEndian::read_i32(&record[24..28]);
    let node = Node::from_bytes(&record[28..48])?;

    // A delta base below 0 or after the entry itself can never be resolved.
    if base < 0 || base > rev.0 {
        return Err(RevlogError::corrupted(format!(
            "base revision for rev {} is invalid",
            rev
        )));
    }
    for parent in [p1, p2] {
        if parent < NULL_REVISION.0 || parent >= rev.0 {
            return Err(RevlogError::corrupted(format!(
                "parent revision for rev {} is invalid",
                rev
            )));
        }
    }
    if index.nodemap.contains_key(&node) {
        return Err(RevlogError::corrupted(format!(
            "duplicated node {:x} in index",
            node
        )));
    }
    Ok(IndexEntry {
        offset: offset_flags >> 16,
        flags: (offset_flags & 0xFFFF) as u16,
        compressed_len,
        base: Revision(base),
        link,
        p1: Revision(p1),
        p2: Revision(p2),
        node,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revlog::hash;
    use crate::revlog::NULL_NODE;

    fn sample_entry(rev: Revision, text: &[u8]) -> IndexEntry {
        IndexEntry {
            offset: rev.0 as u64 * 10,
            flags: 0,
            compressed_len: text.len() as u32,
            base: rev,
            link: rev.0,
            p1: Revision(rev.0 - 1),
            p2: NULL_REVISION,
            node: hash(text, &NULL_NODE, &NULL_NODE),
        }
    }

    #[test]
    fn test_pack_unpack_round_trip() {
        let mut index = Index::default();
        let mut on_disk = vec![];
        for (i, text) in [&b"one"[..], b"two", b"three"].iter().enumerate() {
            let (_, bytes) =
                index.append(sample_entry(Revision(i as i32), text));
            on_disk.extend_from_slice(&bytes);
        }
        let reloaded = Index::parse(&on_disk).unwrap();
        assert_eq!(reloaded.len(), 3);
        for rev in 0..3 {
            let rev = Revision(rev);
            assert_eq!(reloaded.entry(rev), index.entry(rev));
            let node = *index.node(rev).unwrap();
            assert_eq!(reloaded.rev_from_node(&node), Some(rev));
        }
    }

    #[test]
    fn test_parse_rejects_partial_record() {
        assert!(Index::parse(&[0; INDEX_ENTRY_SIZE + 1]).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_base() {
        let mut entry = sample_entry(Revision(0), b"one");
        entry.base = Revision(3);
        let bytes = entry.pack();
        assert!(Index::parse(&bytes).is_err());
    }

    #[test]
    fn test_parse_rejects_forward_parent() {
        let mut entry = sample_entry(Revision(0), b"one");
        entry.p1 = Revision(0);
        let bytes = entry.pack();
        assert!(Index::parse(&bytes).is_err());
    }

    #[test]
    fn test_truncate() {
        let mut index = Index::default();
        for (i, text) in [&b"one"[..], b"two", b"three"].iter().enumerate() {
            index.append(sample_entry(Revision(i as i32), text));
        }
        let dropped = *index.node(Revision(1)).unwrap();
        index.truncate(Revision(1));
        assert_eq!(index.len(), 1);
        assert_eq!(index.rev_from_node(&dropped), None);
        assert_eq!(index.check_revision(1.into()), None);
        assert_eq!(index.check_revision(0.into()), Some(Revision(0)));
    }

    #[test]
    fn test_null_revision_handling() {
        let index = Index::default();
        assert_eq!(index.rev_from_node(&NULL_NODE), Some(NULL_REVISION));
        assert_eq!(index.entry(NULL_REVISION), None);
        assert_eq!(
            index.check_revision(NULL_REVISION.into()),
            Some(NULL_REVISION)
        );
    }
}
