//! Reading a changegroup stream and applying it to a store.

use std::collections::hash_map::Entry;
use std::io::Read;

use tracing::debug;

use super::read_chunk;
use super::ChangegroupVersion;
use super::DeltaChunk;
use crate::errors::RevlogError;
use crate::revlog::BaseRevision;
use crate::revlog::Node;
use crate::revlog::Revlog;
use crate::store::filelog_name;
use crate::store::LogStore;
use crate::transaction::FileTransaction;

/// Consumes a changegroup stream, section by section, and applies it to a
/// [`LogStore`] inside one transaction.
///
/// The expected stream layout is fixed: a changelog group, a manifest
/// group, then file sections until the empty path chunk. Anything else is a
/// protocol violation.
pub struct Unpacker<R: Read> {
    stream: R,
    version: ChangegroupVersion,
}

impl<R: Read> Unpacker<R> {
    pub fn new(stream: R, version: ChangegroupVersion) -> Self {
        Unpacker { stream, version }
    }

    /// Apply the whole stream, returning how many changesets were new.
    ///
    /// On error, every revlog file is truncated back to its pre-application
    /// length. The in-memory `store` is stale at that point and must be
    /// reloaded; [`LogStore::apply_changegroup`] takes care of that.
    pub fn apply(
        mut self,
        store: &mut LogStore,
    ) -> Result<usize, RevlogError> {
        let mut transaction = FileTransaction::new();
        match self.apply_sections(store, &mut transaction) {
            Ok(new_changesets) => {
                transaction.commit();
                debug!(new_changesets, "changegroup applied");
                Ok(new_changesets)
            }
            Err(error) => {
                if let Err(abort_error) = transaction.abort() {
                    debug!(%abort_error, "changegroup rollback failed");
                }
                Err(error)
            }
        }
    }

    fn apply_sections(
        &mut self,
        store: &mut LogStore,
        transaction: &mut FileTransaction,
    ) -> Result<usize, RevlogError> {
        let LogStore { dir, changelog, manifest, filelogs } = store;

        let chunks = self.read_group()?;
        if chunks.is_empty() {
            return Err(RevlogError::protocol(
                "received an empty changelog group",
            ));
        }
        let start = changelog.len();
        // Every inserted changeset links to itself; insertions are numbered
        // in stream order starting right after the current tip.
        let mut next_link = start as BaseRevision;
        changelog.add_group(
            chunks,
            |_| {
                let link = next_link;
                next_link += 1;
                Ok(link)
            },
            transaction,
        )?;
        let new_changesets = changelog.len() - start;

        let chunks = self.read_group()?;
        manifest.add_group(
            chunks,
            |link| resolve_link(changelog, link),
            transaction,
        )?;

        while let Some(path) = read_chunk(&mut self.stream)? {
            let chunks = self.read_group()?;
            let filelog = match filelogs.entry(path.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry
                    .insert(Revlog::open(&*dir, &filelog_name(&path))?),
            };
            debug!(
                path = %String::from_utf8_lossy(&path),
                chunks = chunks.len(),
                "applying file group"
            );
            filelog.add_group(
                chunks,
                |link| resolve_link(changelog, link),
                transaction,
            )?;
        }
        Ok(new_changesets)
    }

    /// Read a whole delta group, up to its terminator.
    fn read_group(&mut self) -> Result<Vec<DeltaChunk>, RevlogError> {
        let mut chunks = Vec::new();
        while let Some(payload) = read_chunk(&mut self.stream)? {
            chunks.push(DeltaChunk::parse(&payload, self.version)?);
        }
        Ok(chunks)
    }
}

fn resolve_link(
    changelog: &Revlog,
    link: &Node,
) -> Result<BaseRevision, RevlogError> {
    changelog.rev_from_node(link).map(|rev| rev.0).map_err(|_| {
        RevlogError::Integrity(format!(
            "link node {:x} is not in the changelog",
            link
        ))
    })
}
