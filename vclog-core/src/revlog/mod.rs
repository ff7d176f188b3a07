//! Concepts for handling versioned revision history.

pub mod compression;
pub mod diff;
pub mod index;
pub mod node;
pub mod patch;
#[allow(clippy::module_inception)]
pub mod revlog;

pub use node::{Node, NODE_BYTES_LENGTH, NULL_NODE};
pub use revlog::{Revlog, RevlogOpenOptions};

use sha1::{Digest, Sha1};

use crate::errors::RevlogError;

/// Revision numbers are encoded in 4 bytes on disk and are liberally
/// converted to ints, whence the i32.
pub type BaseRevision = i32;

/// A checked revision number.
///
/// In contrast to the more general [`UncheckedRevision`], these are
/// "checked" in the sense that they should only be used for revisions that
/// are valid for a given index (i.e. in bounds).
#[derive(
    Debug,
    derive_more::Display,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
pub struct Revision(pub BaseRevision);

/// Unchecked revision numbers.
///
/// Values of this type have no guarantee of being a valid revision number
/// in any context. Use [`index::Index::check_revision`] to get a valid
/// revision within the appropriate index object.
#[derive(
    Debug,
    derive_more::Display,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
)]
pub struct UncheckedRevision(pub BaseRevision);

impl From<Revision> for UncheckedRevision {
    fn from(value: Revision) -> Self {
        Self(value.0)
    }
}

impl From<BaseRevision> for UncheckedRevision {
    fn from(value: BaseRevision) -> Self {
        Self(value)
    }
}

/// Marker expressing the absence of a parent.
///
/// Independently of the actual representation, `NULL_REVISION` is guaranteed
/// to be smaller than all existing revisions.
pub const NULL_REVISION: Revision = Revision(-1);

/// The simplest expression of what we need of revision DAGs.
pub trait Graph {
    /// Return the two parents of the given `Revision`.
    ///
    /// Each of the parents can be independently `NULL_REVISION`.
    fn parents(&self, rev: Revision) -> Result<[Revision; 2], GraphError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum GraphError {
    ParentOutOfRange(Revision),
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::ParentOutOfRange(revision) => {
                write!(f, "parent out of range ({})", revision)
            }
        }
    }
}

impl<T: Graph> Graph for &T {
    fn parents(&self, rev: Revision) -> Result<[Revision; 2], GraphError> {
        (*self).parents(rev)
    }
}

impl From<GraphError> for RevlogError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::ParentOutOfRange(rev) => {
                RevlogError::corrupted(format!("parent out of range ({})", rev))
            }
        }
    }
}

/// Calculate the node of a revision given its data and its parents.
///
/// The two parent values are sorted before being fed to the digest so that
/// the identity does not depend on which side of a merge a parent came from.
/// The digest layout is a wire compatibility requirement, not an
/// implementation choice.
pub fn hash(data: &[u8], p1: &Node, p2: &Node) -> Node {
    let mut hasher = Sha1::new();
    let (a, b) = (p1.as_bytes(), p2.as_bytes());
    if a > b {
        hasher.update(b);
        hasher.update(a);
    } else {
        hasher.update(a);
        hasher.update(b);
    }
    hasher.update(data);
    let digest: [u8; NODE_BYTES_LENGTH] = hasher.finalize().into();
    digest.into()
}
