//! Git operations: repository discovery, tree identities, tree export and
//! the commit log.

mod repository;

pub use repository::{CommitLog, Repository};

pub(crate) use repository::canonical;
