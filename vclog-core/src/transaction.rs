//! The transaction system is based on the append-only nature of the core
//! files: undoing an operation is truncating every file it grew back to its
//! pre-operation length.

use std::fs::OpenOptions;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::errors::IoResultExt;
use crate::errors::RevlogError;

/// Exposes the necessary methods to safely write to the append-only core
/// datastructures.
pub trait Transaction {
    /// Record the state of an append-only file before update.
    ///
    /// Only the first offset recorded for a given file is kept: that is the
    /// length to restore on abort.
    fn add(&mut self, file: impl AsRef<Path>, offset: u64);
}

/// A journal of pre-operation file lengths, able to roll the files back.
///
/// Writers register every file before growing it; [`FileTransaction::abort`]
/// truncates the files in reverse registration order, so the last file to
/// have grown is the first to shrink back.
#[derive(Debug, Default)]
pub struct FileTransaction {
    journal: Vec<(PathBuf, u64)>,
}

impl Transaction for FileTransaction {
    fn add(&mut self, file: impl AsRef<Path>, offset: u64) {
        let file = file.as_ref();
        if self.journal.iter().any(|(path, _)| path == file) {
            return;
        }
        self.journal.push((file.to_owned(), offset));
    }
}

impl FileTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the journal, making the operation permanent.
    pub fn commit(mut self) {
        self.journal.clear();
    }

    /// Truncate every registered file back to its recorded length, in
    /// reverse registration order.
    pub fn abort(&mut self) -> Result<(), RevlogError> {
        debug!(files = self.journal.len(), "aborting transaction");
        for (path, offset) in self.journal.drain(..).rev() {
            // A file registered before its first write may not exist yet.
            if !path.exists() {
                continue;
            }
            let file = OpenOptions::new()
                .write(true)
                .open(&path)
                .when_truncating_file(&path)?;
            file.set_len(offset).when_truncating_file(&path)?;
        }
        Ok(())
    }

    /// The number of files this transaction would roll back.
    pub fn len(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_truncates_in_reverse_order() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("log.d");
        let index = dir.path().join("log.i");
        std::fs::write(&data, b"data").unwrap();
        std::fs::write(&index, b"index").unwrap();

        let mut tr = FileTransaction::new();
        tr.add(&data, 4);
        tr.add(&index, 5);
        // later registrations of the same file keep the first offset
        tr.add(&data, 40);
        std::fs::write(&data, b"data plus more").unwrap();
        std::fs::write(&index, b"index plus more").unwrap();

        tr.abort().unwrap();
        assert_eq!(std::fs::read(&data).unwrap(), b"data");
        assert_eq!(std::fs::read(&index).unwrap(), b"index");
    }

    #[test]
    fn test_commit_keeps_growth() {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("log.d");
        std::fs::write(&data, b"").unwrap();

        let mut tr = FileTransaction::new();
        tr.add(&data, 0);
        std::fs::write(&data, b"grown").unwrap();
        tr.commit();
        assert_eq!(std::fs::read(&data).unwrap(), b"grown");
    }

    #[test]
    fn test_abort_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tr = FileTransaction::new();
        tr.add(dir.path().join("never-written.d"), 0);
        tr.abort().unwrap();
    }
}
