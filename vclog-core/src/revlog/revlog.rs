//! The revlog: one append-only versioned stream, composed of an index file
//! (`name.i`) and a data file (`name.d`).
//!
//! Every revision is stored in the data file either as a compressed full
//! text or as a compressed delta against the revision just before it. The
//! index records, per revision, where its data lives and which full-text
//! revision its delta chain starts at.

use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use super::compression::compress;
use super::compression::decompress;
use super::compression::ZLIB_DEFAULT_LEVEL;
use super::diff::diff;
use super::hash;
use super::index::Index;
use super::index::IndexEntry;
use super::index::INDEX_ENTRY_SIZE;
use super::node::Node;
use super::node::NULL_NODE;
use super::patch::apply_chain;
use super::patch::Delta;
use super::BaseRevision;
use super::Graph;
use super::GraphError;
use super::Revision;
use super::NULL_REVISION;
use crate::changegroup::packer::write_group;
use crate::changegroup::ChangegroupVersion;
use crate::changegroup::DeltaChunk;
use crate::errors::IoResultExt;
use crate::errors::RevlogError;
use crate::errors::RevlogResultExt;
use crate::transaction::Transaction;

/// Options to govern how a revlog is opened and written.
#[derive(Debug, Clone, Copy)]
pub struct RevlogOpenOptions {
    /// zlib level used when storing new chunks, between 0 and 9 included.
    pub zlib_level: u32,
    /// A delta chain is abandoned for a fresh full text once its on-disk
    /// span exceeds this many times the new text's length.
    pub delta_chain_ratio: u64,
}

impl Default for RevlogOpenOptions {
    fn default() -> Self {
        Self { zlib_level: ZLIB_DEFAULT_LEVEL, delta_chain_ratio: 2 }
    }
}

/// A single writeable revision log.
pub struct Revlog {
    index_path: PathBuf,
    data_path: PathBuf,
    index: Index,
    /// End offset of the data file, tracked to avoid a stat on every append.
    data_end: u64,
    /// Cache of the last reconstructed revision, sized at one entry.
    cache: Option<(Node, Revision, Vec<u8>)>,
    options: RevlogOpenOptions,
}

impl Graph for Revlog {
    fn parents(&self, rev: Revision) -> Result<[Revision; 2], GraphError> {
        self.index.parents(rev)
    }
}

impl Revlog {
    /// Open (or create on first write) the revlog called `name` in `dir`.
    pub fn open(
        dir: impl AsRef<Path>,
        name: &str,
    ) -> Result<Self, RevlogError> {
        Self::open_with(dir, name, RevlogOpenOptions::default())
    }

    pub fn open_with(
        dir: impl AsRef<Path>,
        name: &str,
        options: RevlogOpenOptions,
    ) -> Result<Self, RevlogError> {
        let dir = dir.as_ref();
        let index_path = dir.join(format!("{}.i", name));
        let data_path = dir.join(format!("{}.d", name));
        let bytes = fs::read(&index_path)
            .when_reading_file(&index_path)
            .io_not_found_as_none()?
            .unwrap_or_default();
        let index = Index::parse(&bytes)?;
        // `entry` maps the null revision of an empty index to `None`.
        let data_end = index
            .entry(Revision(index.len() as BaseRevision - 1))
            .map(|last| last.offset + last.compressed_len as u64)
            .unwrap_or(0);
        Ok(Revlog {
            index_path,
            data_path,
            index,
            data_end,
            cache: None,
            options,
        })
    }

    /// Number of revisions in this revlog.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    /// The most recently added node, or the null node when empty.
    pub fn tip(&self) -> Node {
        self.node_or_null(self.tip_rev())
    }

    fn tip_rev(&self) -> Revision {
        match self.len() {
            0 => NULL_REVISION,
            len => Revision(len as BaseRevision - 1),
        }
    }

    /// The node for a revision number, if it exists in this revlog.
    pub fn node_from_rev(&self, rev: Revision) -> Option<&Node> {
        if rev == NULL_REVISION {
            return Some(&NULL_NODE);
        }
        self.index.node(rev)
    }

    /// The revision number for a node.
    pub fn rev_from_node(&self, node: &Node) -> Result<Revision, RevlogError> {
        self.index
            .rev_from_node(node)
            .ok_or_else(|| RevlogError::unknown_revision(format!("{:x}", node)))
    }

    pub fn has_node(&self, node: &Node) -> bool {
        self.index.has_node(node)
    }

    /// The parent nodes of `node`, null-padded.
    pub fn parents(&self, node: &Node) -> Result<(Node, Node), RevlogError> {
        if node.is_null() {
            return Ok((NULL_NODE, NULL_NODE));
        }
        let rev = self.rev_from_node(node)?;
        let [p1, p2] = self.index.parents(rev)?;
        Ok((self.node_or_null(p1), self.node_or_null(p2)))
    }

    fn node_or_null(&self, rev: Revision) -> Node {
        self.index.node(rev).copied().unwrap_or(NULL_NODE)
    }

    /// Return the full data associated with a node.
    ///
    /// All entries of the delta chain are retrieved as needed and the deltas
    /// applied to the initial full text. The result is checked against the
    /// recorded node before being returned.
    pub fn revision(&mut self, node: &Node) -> Result<Vec<u8>, RevlogError> {
        if node.is_null() {
            return Ok(Vec::new());
        }
        let rev = self.rev_from_node(node)?;
        if let Some((cached_node, _, text)) = &self.cache {
            if cached_node == node {
                return Ok(text.clone());
            }
        }
        let text = self.rebuild(rev)?;
        let [p1, p2] = self.index.parents(rev)?;
        let reconstructed =
            hash(&text, &self.node_or_null(p1), &self.node_or_null(p2));
        if reconstructed != *node {
            return Err(RevlogError::Integrity(format!(
                "hash check failed for revision {}",
                rev
            )));
        }
        self.cache = Some((*node, rev, text.clone()));
        Ok(text)
    }

    /// [`Self::revision`] by revision number.
    pub fn revision_for_rev(
        &mut self,
        rev: Revision,
    ) -> Result<Vec<u8>, RevlogError> {
        if rev == NULL_REVISION {
            return Ok(Vec::new());
        }
        let node = *self
            .index
            .node(rev)
            .ok_or_else(|| RevlogError::unknown_revision(rev))?;
        self.revision(&node)
    }

    /// Rebuild a revision's text from its delta chain: decompress the chain's
    /// full-text base, then apply every intervening delta in forward order.
    fn rebuild(&self, rev: Revision) -> Result<Vec<u8>, RevlogError> {
        let entry = self
            .index
            .entry(rev)
            .ok_or_else(|| RevlogError::unknown_revision(rev))?;
        let base = entry.base;
        let base_entry = self.index.entry(base).ok_or_else(|| {
            RevlogError::corrupted(format!(
                "base revision for rev {} is invalid",
                rev
            ))
        })?;
        if !base_entry.is_full_text(base) {
            return Err(RevlogError::corrupted(format!(
                "delta chain of rev {} does not start at a full text",
                rev
            )));
        }
        let full_text = decompress(&self.chunk(base)?)?;
        let mut deltas = Vec::with_capacity((rev.0 - base.0) as usize);
        for intervening in (base.0 + 1)..=rev.0 {
            deltas.push(decompress(&self.chunk(Revision(intervening))?)?);
        }
        apply_chain(&full_text, &deltas)
    }

    /// Read a revision's raw (still compressed) chunk from the data file.
    fn chunk(&self, rev: Revision) -> Result<Vec<u8>, RevlogError> {
        let entry = self
            .index
            .entry(rev)
            .ok_or_else(|| RevlogError::unknown_revision(rev))?;
        if entry.compressed_len == 0 {
            return Ok(Vec::new());
        }
        let mut file =
            File::open(&self.data_path).when_reading_file(&self.data_path)?;
        file.seek(SeekFrom::Start(entry.offset))
            .when_reading_file(&self.data_path)?;
        let mut data = vec![0; entry.compressed_len as usize];
        file.read_exact(&mut data).when_reading_file(&self.data_path)?;
        Ok(data)
    }

    /// Add a revision, returning its node.
    ///
    /// Adding a revision whose content+parents hash is already present is
    /// not an error: the existing node is returned and nothing grows.
    pub fn add_revision(
        &mut self,
        text: &[u8],
        p1: Node,
        p2: Node,
        link: BaseRevision,
        transaction: &mut impl Transaction,
    ) -> Result<Node, RevlogError> {
        self.add_raw_revision(text, p1, p2, link, None, transaction)
    }

    /// Append path shared by [`Self::add_revision`] and group application.
    /// When `expected` is given, the computed node must match it.
    pub(crate) fn add_raw_revision(
        &mut self,
        text: &[u8],
        p1: Node,
        p2: Node,
        link: BaseRevision,
        expected: Option<Node>,
        transaction: &mut impl Transaction,
    ) -> Result<Node, RevlogError> {
        let node = hash(text, &p1, &p2);
        if let Some(expected) = expected {
            if node != expected {
                return Err(RevlogError::Integrity(format!(
                    "incoming revision {:x} does not hash to its node",
                    expected
                )));
            }
        }
        if self.index.has_node(&node) {
            return Ok(node);
        }
        let p1_rev = self.parent_rev(&p1)?;
        let p2_rev = self.parent_rev(&p2)?;

        let rev = Revision(self.len() as BaseRevision);
        let (base, data) = self.storage_for(rev, text)?;
        let entry = IndexEntry {
            offset: self.data_end,
            flags: 0,
            compressed_len: data.len() as u32,
            base,
            link,
            p1: p1_rev,
            p2: p2_rev,
            node,
        };
        self.append_entry(entry, &data, transaction)?;
        debug!(
            rev = rev.0,
            node = %node.short(),
            delta = base != rev,
            "appended revision"
        );
        self.cache = Some((node, rev, text.to_vec()));
        Ok(node)
    }

    fn parent_rev(&self, parent: &Node) -> Result<Revision, RevlogError> {
        self.index.rev_from_node(parent).ok_or_else(|| {
            RevlogError::Integrity(format!(
                "parent {:x} is not present in the index",
                parent
            ))
        })
    }

    /// Decide between delta and full-text storage for a new revision.
    ///
    /// A delta against the immediately preceding revision is kept as long
    /// as the delta chain it extends, deltas included, stays within the
    /// configured ratio of the new text's size. Anything else gets a fresh
    /// full text, capping the number of patch applications any retrieval
    /// needs.
    fn storage_for(
        &mut self,
        rev: Revision,
        text: &[u8],
    ) -> Result<(Revision, Vec<u8>), RevlogError> {
        let level = self.options.zlib_level;
        if rev.0 == 0 {
            return Ok((rev, compress(text, level)?));
        }
        let prev = Revision(rev.0 - 1);
        let prev_text = self.revision_for_rev(prev)?;
        let delta = compress(&diff(&prev_text, text), level)?;

        let prev_entry = self
            .index
            .entry(prev)
            .ok_or_else(|| RevlogError::unknown_revision(prev))?;
        let chain_base = prev_entry.base;
        let chain_start = self
            .index
            .entry(chain_base)
            .ok_or_else(|| RevlogError::unknown_revision(chain_base))?
            .offset;
        let distance = self.data_end - chain_start + delta.len() as u64;
        if distance > self.options.delta_chain_ratio * text.len() as u64 {
            Ok((rev, compress(text, level)?))
        } else {
            Ok((chain_base, delta))
        }
    }

    /// Append `data` to the data file and `entry` to the index, registering
    /// both files with the transaction first.
    ///
    /// Data bytes land before the index record that references them, so a
    /// reader never observes an index entry whose data is missing.
    fn append_entry(
        &mut self,
        entry: IndexEntry,
        data: &[u8],
        transaction: &mut impl Transaction,
    ) -> Result<Revision, RevlogError> {
        transaction.add(&self.data_path, self.data_end);
        transaction.add(
            &self.index_path,
            (self.index.len() * INDEX_ENTRY_SIZE) as u64,
        );
        let mut data_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.data_path)
            .when_writing_file(&self.data_path)?;
        data_file.write_all(data).when_writing_file(&self.data_path)?;
        let (rev, record) = self.index.append(entry);
        let mut index_file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.index_path)
            .when_writing_file(&self.index_path)?;
        index_file
            .write_all(&record)
            .when_writing_file(&self.index_path)?;
        self.data_end += data.len() as u64;
        Ok(rev)
    }

    /// Truncate the revlog back to `rev`: every revision from `rev`
    /// (included) onward is removed, index first, then data.
    ///
    /// This is the only supported way to remove history. The caller must
    /// guarantee no other reader expects the removed revisions.
    pub fn strip(&mut self, rev: Revision) -> Result<(), RevlogError> {
        if rev.0 < 0 || rev.0 as usize >= self.len() {
            return Err(RevlogError::unknown_revision(rev));
        }
        let data_cut = self
            .index
            .entry(rev)
            .ok_or_else(|| RevlogError::unknown_revision(rev))?
            .offset;
        let index_cut = (rev.0 as usize * INDEX_ENTRY_SIZE) as u64;
        debug!(rev = rev.0, "stripping revlog");
        truncate_file(&self.index_path, index_cut)?;
        truncate_file(&self.data_path, data_cut)?;
        self.index.truncate(rev);
        self.data_end = data_cut;
        self.cache = None;
        Ok(())
    }

    /// Revisions without any recorded child, in ascending revision order.
    pub fn heads(&self) -> Result<Vec<Node>, RevlogError> {
        self.heads_internal(None)
    }

    /// Same as [`Self::heads`], considering only revisions from `stop`
    /// onward.
    pub fn heads_from(&self, stop: &Node) -> Result<Vec<Node>, RevlogError> {
        self.heads_internal(Some(stop))
    }

    fn heads_internal(
        &self,
        stop: Option<&Node>,
    ) -> Result<Vec<Node>, RevlogError> {
        let stop_rev = match stop {
            Some(node) => self.rev_from_node(node)?.0.max(0),
            None => 0,
        };
        let mut has_child = vec![false; self.len()];
        let mut heads = Vec::new();
        // One backward scan: a revision seen before any of its children
        // would be, is a head.
        for r in (stop_rev..self.len() as BaseRevision).rev() {
            let rev = Revision(r);
            if !has_child[r as usize] {
                heads.push(self.node_or_null(rev));
            }
            for parent in self.index.parents(rev)? {
                if parent != NULL_REVISION {
                    has_child[parent.0 as usize] = true;
                }
            }
        }
        heads.reverse();
        Ok(heads)
    }

    /// Lowest common ancestor of two nodes, or the null node when their
    /// histories are unrelated.
    pub fn ancestor(&self, a: &Node, b: &Node) -> Result<Node, RevlogError> {
        let a = self.rev_from_node(a)?;
        let b = self.rev_from_node(b)?;
        let rev = crate::ancestors::common_ancestor(&self.index, a, b)?;
        Ok(self.node_or_null(rev))
    }

    /// All ancestors of `node` down to (and including) `stop`.
    pub fn reachable(
        &self,
        node: &Node,
        stop: &Node,
    ) -> Result<std::collections::HashSet<Node>, RevlogError> {
        let rev = self.rev_from_node(node)?;
        let stop = self.rev_from_node(stop)?;
        let revs = crate::ancestors::reachable(&self.index, rev, stop)?;
        Ok(revs.into_iter().map(|rev| self.node_or_null(rev)).collect())
    }

    /// The topologically sorted set of nodes that are both descendants of a
    /// root and ancestors of a head, together with the effectively used
    /// roots and heads.
    ///
    /// `None` means "no constraint on that side", like an absent argument.
    pub fn nodes_between(
        &self,
        roots: Option<&[Node]>,
        heads: Option<&[Node]>,
    ) -> Result<(Vec<Node>, Vec<Node>, Vec<Node>), RevlogError> {
        let to_revs = |nodes: &[Node]| -> Result<Vec<Revision>, RevlogError> {
            nodes.iter().map(|n| self.rev_from_node(n)).collect()
        };
        let roots = match roots {
            Some(roots) => Some(to_revs(roots)?),
            None => None,
        };
        let heads = match heads {
            Some(heads) => Some(to_revs(heads)?),
            None => None,
        };
        let (between, roots, heads) = crate::dagops::nodes_between(
            &self.index,
            self.len(),
            roots.as_deref(),
            heads.as_deref(),
        )?;
        let to_nodes = |revs: Vec<Revision>| -> Vec<Node> {
            revs.into_iter().map(|rev| self.node_or_null(rev)).collect()
        };
        Ok((to_nodes(between), to_nodes(roots), to_nodes(heads)))
    }

    /// Serialize `nodes` (already topologically ordered) as one changegroup
    /// subgroup, terminator included.
    pub fn group(
        &mut self,
        nodes: &[Node],
        lookup_link: impl FnMut(&Node) -> Result<Node, RevlogError>,
        version: ChangegroupVersion,
    ) -> Result<Vec<u8>, RevlogError> {
        let mut out = Vec::new();
        write_group(self, nodes, lookup_link, version, &mut out)?;
        Ok(out)
    }

    /// Apply a parsed changegroup subgroup, returning the last node added.
    ///
    /// `link_mapper` is called once per actually-inserted revision, in
    /// insertion order, to translate the wire link node into a local link
    /// revision. Revisions already present are skipped.
    pub fn add_group(
        &mut self,
        chunks: impl IntoIterator<Item = DeltaChunk>,
        mut link_mapper: impl FnMut(&Node) -> Result<BaseRevision, RevlogError>,
        transaction: &mut impl Transaction,
    ) -> Result<Node, RevlogError> {
        let mut previous: Option<Node> = None;
        let mut last = NULL_NODE;
        for chunk in chunks {
            let base = match chunk.delta_base {
                Some(base) => base,
                // The original protocol's implicit base: the previous chunk
                // of the subgroup, or the revision's first parent for the
                // subgroup's first chunk.
                None => previous.unwrap_or(chunk.p1),
            };
            previous = Some(chunk.node);
            if self.index.has_node(&chunk.node) {
                // Two branches independently producing identical
                // content+parents is legitimate; nothing to insert.
                last = chunk.node;
                continue;
            }
            let base_text = self.revision(&base)?;
            let text = Delta::parse(&chunk.delta)?.apply(&base_text)?;
            let link = link_mapper(&chunk.link)?;
            last = self.add_raw_revision(
                &text,
                chunk.p1,
                chunk.p2,
                link,
                Some(chunk.node),
                transaction,
            )?;
        }
        Ok(last)
    }
}

fn truncate_file(path: &Path, length: u64) -> Result<(), RevlogError> {
    if !path.exists() {
        return Ok(());
    }
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .when_truncating_file(path)?;
    file.set_len(length).when_truncating_file(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::transaction::FileTransaction;

    fn add(
        log: &mut Revlog,
        text: &[u8],
        p1: Node,
        p2: Node,
        link: BaseRevision,
    ) -> Node {
        let mut tr = FileTransaction::new();
        let node = log.add_revision(text, p1, p2, link, &mut tr).unwrap();
        tr.commit();
        node
    }

    #[test]
    fn test_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "empty").unwrap();
        assert!(log.is_empty());
        assert_eq!(log.tip(), NULL_NODE);
        assert_eq!(log.revision(&NULL_NODE).unwrap(), b"");
        assert!(matches!(
            log.revision(&crate::revlog::hash(b"x", &NULL_NODE, &NULL_NODE)),
            Err(RevlogError::UnknownRevision(_))
        ));
    }

    #[test]
    fn test_round_trip_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let texts: Vec<Vec<u8>> = (0..10)
            .map(|i| format!("revision {}\ncontent line\n", i).into_bytes())
            .collect();
        let mut nodes = Vec::new();
        {
            let mut log = Revlog::open(dir.path(), "log").unwrap();
            let mut parent = NULL_NODE;
            for (i, text) in texts.iter().enumerate() {
                parent =
                    add(&mut log, text, parent, NULL_NODE, i as BaseRevision);
                nodes.push(parent);
            }
        }
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        assert_eq!(log.len(), 10);
        for (node, text) in nodes.iter().zip(&texts) {
            assert_eq!(&log.revision(node).unwrap(), text);
        }
    }

    #[test]
    fn test_add_revision_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        let first = add(&mut log, b"alpha", NULL_NODE, NULL_NODE, 0);
        let second = add(&mut log, b"alpha", NULL_NODE, NULL_NODE, 0);
        assert_eq!(first, second);
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_delta_chain_and_full_text_cutover() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        let t0 = b"the quick brown fox \n".repeat(20);
        let mut t1 = t0.clone();
        t1.extend_from_slice(b"jumps\n");

        let n0 = add(&mut log, &t0, NULL_NODE, NULL_NODE, 0);
        let n1 = add(&mut log, &t1, n0, NULL_NODE, 1);
        // a small growth on a short chain stays a delta
        assert!(log.index().entry(Revision(0)).unwrap().is_full_text(Revision(0)));
        assert_eq!(log.index().entry(Revision(1)).unwrap().base, Revision(0));

        // a tiny text cannot afford the accumulated chain: full text
        let n2 = add(&mut log, b"tiny", n1, NULL_NODE, 2);
        assert!(log.index().entry(Revision(2)).unwrap().is_full_text(Revision(2)));

        let mut reloaded = Revlog::open(dir.path(), "log").unwrap();
        assert_eq!(reloaded.revision(&n1).unwrap(), t1);
        assert_eq!(reloaded.revision(&n2).unwrap(), b"tiny");
    }

    #[test]
    fn test_corruption_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let node;
        {
            let mut log = Revlog::open(dir.path(), "log").unwrap();
            // short texts are stored raw, which makes the flip surgical
            node = add(&mut log, b"alpha", NULL_NODE, NULL_NODE, 0);
        }
        let data_path = dir.path().join("log.d");
        let mut data = std::fs::read(&data_path).unwrap();
        data[2] ^= 0xFF;
        std::fs::write(&data_path, data).unwrap();

        let mut log = Revlog::open(dir.path(), "log").unwrap();
        assert!(matches!(
            log.revision(&node),
            Err(RevlogError::Integrity(_))
        ));
    }

    #[test]
    fn test_missing_parent_is_integrity_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        let ghost = crate::revlog::hash(b"ghost", &NULL_NODE, &NULL_NODE);
        let mut tr = FileTransaction::new();
        assert!(matches!(
            log.add_revision(b"text", ghost, NULL_NODE, 0, &mut tr),
            Err(RevlogError::Integrity(_))
        ));
    }

    #[test]
    fn test_transaction_abort_rolls_back_append() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        let kept = add(&mut log, b"kept", NULL_NODE, NULL_NODE, 0);

        let mut tr = FileTransaction::new();
        log.add_revision(b"rolled back", kept, NULL_NODE, 1, &mut tr)
            .unwrap();
        tr.abort().unwrap();

        let mut reloaded = Revlog::open(dir.path(), "log").unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.revision(&kept).unwrap(), b"kept");
    }

    #[test]
    fn test_concrete_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();

        let a = add(&mut log, b"alpha", NULL_NODE, NULL_NODE, 0);
        let b = add(&mut log, b"alpha\nbeta", a, NULL_NODE, 1);

        assert_eq!(log.parents(&b).unwrap(), (a, NULL_NODE));
        assert_eq!(log.revision(&a).unwrap(), b"alpha");
        assert_eq!(log.ancestor(&a, &b).unwrap(), a);
        assert_eq!(log.heads().unwrap(), vec![b]);

        log.strip(Revision(1)).unwrap();
        assert_eq!(log.heads().unwrap(), vec![a]);
        assert_eq!(log.len(), 1);
        assert!(!log.has_node(&b));

        // the stripped revision can be re-added
        let b_again = add(&mut log, b"alpha\nbeta", a, NULL_NODE, 1);
        assert_eq!(b_again, b);
    }

    #[test]
    fn test_node_level_graph_queries() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        let root = add(&mut log, b"root", NULL_NODE, NULL_NODE, 0);
        let left = add(&mut log, b"left", root, NULL_NODE, 1);
        let right = add(&mut log, b"right", root, NULL_NODE, 2);

        assert_eq!(log.node_from_rev(Revision(0)), Some(&root));
        assert_eq!(log.node_from_rev(NULL_REVISION), Some(&NULL_NODE));
        assert_eq!(log.tip(), right);
        assert_eq!(log.heads_from(&left).unwrap(), vec![left, right]);
        assert_eq!(
            log.reachable(&left, &root).unwrap(),
            [left, root].into_iter().collect()
        );
        assert_eq!(
            log.nodes_between(Some(&[root]), Some(&[left])).unwrap(),
            (vec![root, left], vec![root], vec![left])
        );
    }

    #[test]
    fn test_group_and_add_group_round_trip() {
        let source_dir = tempfile::tempdir().unwrap();
        let mut source = Revlog::open(source_dir.path(), "log").unwrap();
        let a = add(&mut source, b"alpha", NULL_NODE, NULL_NODE, 0);
        let b = add(&mut source, b"alpha\nbeta", a, NULL_NODE, 1);
        let wire = source
            .group(&[a, b], |node| Ok(*node), ChangegroupVersion::V2)
            .unwrap();

        let mut chunks = Vec::new();
        let mut stream = &wire[..];
        while let Some(payload) =
            crate::changegroup::read_chunk(&mut stream).unwrap()
        {
            chunks.push(
                DeltaChunk::parse(&payload, ChangegroupVersion::V2).unwrap(),
            );
        }
        assert_eq!(chunks.len(), 2);
        assert!(stream.is_empty());

        let dest_dir = tempfile::tempdir().unwrap();
        let mut dest = Revlog::open(dest_dir.path(), "log").unwrap();
        let mut tr = FileTransaction::new();
        let last = dest.add_group(chunks, |_| Ok(0), &mut tr).unwrap();
        tr.commit();
        assert_eq!(last, b);
        assert_eq!(dest.revision(&a).unwrap(), b"alpha");
        assert_eq!(dest.revision(&b).unwrap(), b"alpha\nbeta");
    }

    #[test]
    fn test_heads_with_merge_and_branch() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = Revlog::open(dir.path(), "log").unwrap();
        let root = add(&mut log, b"root", NULL_NODE, NULL_NODE, 0);
        let left = add(&mut log, b"left", root, NULL_NODE, 1);
        let right = add(&mut log, b"right", root, NULL_NODE, 2);
        assert_eq!(log.heads().unwrap(), vec![left, right]);

        let merge = add(&mut log, b"merge", left, right, 3);
        assert_eq!(log.heads().unwrap(), vec![merge]);
        assert_eq!(log.ancestor(&left, &right).unwrap(), root);
    }
}
