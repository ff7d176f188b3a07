//! Assembling a changegroup stream from local revlogs.

use std::io::Write;

use tracing::debug;

use super::write_chunk;
use super::write_terminator;
use super::ChangegroupVersion;
use super::DeltaChunk;
use crate::errors::RevlogError;
use crate::revlog::diff::diff;
use crate::revlog::patch::Delta;
use crate::revlog::Node;
use crate::revlog::Revlog;

/// Serialize one delta group for `nodes` of `revlog`, terminator included.
///
/// `nodes` must be in topological order. The delta origin starts at the
/// first node's first parent; each following chunk is a delta against its
/// predecessor in the list, so a receiver can rebuild every text from what
/// it already has plus the stream itself. A null origin degrades to a
/// whole-text delta.
pub(crate) fn write_group(
    revlog: &mut Revlog,
    nodes: &[Node],
    mut lookup_link: impl FnMut(&Node) -> Result<Node, RevlogError>,
    version: ChangegroupVersion,
    out: &mut impl Write,
) -> Result<(), RevlogError> {
    if nodes.is_empty() {
        return write_terminator(out);
    }
    let (mut base, _) = revlog.parents(&nodes[0])?;
    for node in nodes {
        let link = lookup_link(node)?;
        let (p1, p2) = revlog.parents(node)?;
        let delta = if base.is_null() {
            let text = revlog.revision(node)?;
            Delta::full_snapshot(&text).serialize()
        } else {
            let old = revlog.revision(&base)?;
            let new = revlog.revision(node)?;
            diff(&old, &new)
        };
        let delta_base = match version {
            ChangegroupVersion::V1 => None,
            ChangegroupVersion::V2 => Some(base),
        };
        DeltaChunk { node: *node, p1, p2, delta_base, link, delta }
            .write(version, out)?;
        base = *node;
    }
    write_terminator(out)
}

/// Writes a whole changegroup stream, section by section.
///
/// The caller drives it in the fixed stream order: changelog, manifest,
/// then any number of files, then [`Packer::finish`]. Links are resolved by
/// the caller, which knows how its revisions map to changelog nodes.
pub struct Packer<W: Write> {
    out: W,
    version: ChangegroupVersion,
}

impl<W: Write> Packer<W> {
    pub fn new(out: W, version: ChangegroupVersion) -> Self {
        Packer { out, version }
    }

    /// The changelog section. Changelog revisions are their own link.
    pub fn changelog_group(
        &mut self,
        changelog: &mut Revlog,
        nodes: &[Node],
    ) -> Result<(), RevlogError> {
        debug!(revisions = nodes.len(), "packing changelog group");
        write_group(
            changelog,
            nodes,
            |node| Ok(*node),
            self.version,
            &mut self.out,
        )
    }

    pub fn manifest_group(
        &mut self,
        manifest: &mut Revlog,
        nodes: &[Node],
        lookup_link: impl FnMut(&Node) -> Result<Node, RevlogError>,
    ) -> Result<(), RevlogError> {
        debug!(revisions = nodes.len(), "packing manifest group");
        write_group(manifest, nodes, lookup_link, self.version, &mut self.out)
    }

    /// One file section: the path chunk, then the file's delta group.
    pub fn file_group(
        &mut self,
        path: &[u8],
        filelog: &mut Revlog,
        nodes: &[Node],
        lookup_link: impl FnMut(&Node) -> Result<Node, RevlogError>,
    ) -> Result<(), RevlogError> {
        debug!(
            path = %String::from_utf8_lossy(path),
            revisions = nodes.len(),
            "packing file group"
        );
        write_chunk(&mut self.out, path)?;
        write_group(filelog, nodes, lookup_link, self.version, &mut self.out)
    }

    /// Close the stream with the empty path chunk and hand back the writer.
    pub fn finish(mut self) -> Result<W, RevlogError> {
        write_terminator(&mut self.out)?;
        Ok(self.out)
    }
}
