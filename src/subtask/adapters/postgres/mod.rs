//! `PostgreSQL` adapters for sub-task lifecycle persistence.

mod models;
mod schema;
mod store;

pub use store::{PostgresSubTaskStore, SubTaskPgPool};
