//! A minimal multi-revlog store: the fixed changelog and manifest logs plus
//! one revlog per tracked file path, all in a single directory.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use itertools::Itertools;

use crate::changegroup::ChangegroupVersion;
use crate::changegroup::Unpacker;
use crate::errors::RevlogError;
use crate::revlog::Revlog;

/// The destination (or source) of a changegroup: every revlog the stream's
/// fixed section order can touch.
pub struct LogStore {
    pub(crate) dir: PathBuf,
    pub(crate) changelog: Revlog,
    pub(crate) manifest: Revlog,
    /// Filelogs opened on demand, keyed by tracked path.
    pub(crate) filelogs: HashMap<Vec<u8>, Revlog>,
}

impl LogStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, RevlogError> {
        let dir = dir.as_ref().to_owned();
        let changelog = Revlog::open(&dir, "00changelog")?;
        let manifest = Revlog::open(&dir, "00manifest")?;
        Ok(LogStore { dir, changelog, manifest, filelogs: HashMap::new() })
    }

    pub fn changelog(&self) -> &Revlog {
        &self.changelog
    }

    pub fn changelog_mut(&mut self) -> &mut Revlog {
        &mut self.changelog
    }

    pub fn manifest(&self) -> &Revlog {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut Revlog {
        &mut self.manifest
    }

    /// The revlog tracking `path`, opened (or created) on first use.
    pub fn filelog(
        &mut self,
        path: &[u8],
    ) -> Result<&mut Revlog, RevlogError> {
        match self.filelogs.entry(path.to_vec()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry
                .insert(Revlog::open(&self.dir, &filelog_name(path))?)),
        }
    }

    /// Apply a changegroup stream transactionally, returning how many
    /// changesets were new.
    ///
    /// Either every section applies and the result is committed, or nothing
    /// is left behind: on error the revlog files are rolled back and the
    /// in-memory state reloaded from them.
    pub fn apply_changegroup(
        &mut self,
        stream: impl Read,
        version: ChangegroupVersion,
    ) -> Result<usize, RevlogError> {
        match Unpacker::new(stream, version).apply(self) {
            Ok(new_changesets) => Ok(new_changesets),
            Err(error) => {
                self.reload()?;
                Err(error)
            }
        }
    }

    /// Re-read every revlog from disk, dropping in-memory state.
    fn reload(&mut self) -> Result<(), RevlogError> {
        self.changelog = Revlog::open(&self.dir, "00changelog")?;
        self.manifest = Revlog::open(&self.dir, "00manifest")?;
        self.filelogs.clear();
        Ok(())
    }
}

/// On-disk name for the revlog of a tracked path: the hex of the path
/// bytes. Collision-free and filesystem-safe without an escaping scheme,
/// and it can never clash with the `00`-prefixed fixed logs, whose names
/// are not valid hex.
pub(crate) fn filelog_name(path: &[u8]) -> String {
    path.iter()
        .format_with("", |byte, f| f(&format_args!("{:02x}", byte)))
        .to_string()
}
