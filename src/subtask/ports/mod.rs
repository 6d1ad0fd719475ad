//! Port contracts for the sub-task lifecycle.
//!
//! Ports define infrastructure-agnostic interfaces used by the state engine.

pub mod directory;
pub mod store;

#[cfg(test)]
pub use directory::MockAuthorizationDirectory;
pub use directory::{AuthorizationDirectory, DirectoryError, DirectoryResult};
pub use store::{
    SubTaskStore, SubTaskStoreError, SubTaskStoreResult, SubTaskTransaction,
    TransactionIsolation,
};
