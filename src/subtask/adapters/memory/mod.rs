//! In-memory adapters for tests and local tooling.

mod directory;
mod store;

pub use directory::InMemoryDirectory;
pub use store::InMemorySubTaskStore;
