//! An append-only, delta-compressed, content-addressed revision storage
//! engine, together with the changegroup wire format used to exchange
//! revisions between two such stores.
//!
//! The core type is [`revlog::Revlog`], one versioned stream of texts.
//! [`store::LogStore`] composes the fixed changelog and manifest logs with
//! per-file logs, which is all the structure the changegroup stream layout
//! assumes.

mod ancestors;
pub mod changegroup;
pub mod dagops;
pub mod errors;
pub mod revlog;
pub mod store;
pub mod testing; // unconditionally built, for use from integration tests
pub mod transaction;

pub use ancestors::{common_ancestor, reachable, AncestorsIterator};

// Export very common types to make discovery easier
pub use revlog::{
    BaseRevision, Graph, GraphError, Node, Revision, UncheckedRevision,
    NODE_BYTES_LENGTH, NULL_NODE, NULL_REVISION,
};

pub use errors::RevlogError;
pub use store::LogStore;
