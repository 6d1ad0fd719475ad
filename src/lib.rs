//! Task dispatcher: the sub-task lifecycle state engine for field-service
//! work orders.
//!
//! Work orders (tasks) are split into typed sub-tasks that field executors
//! pick, work on, and submit, and that supervisors and CGP verify. Every
//! status change goes through one engine that authorizes the actor, checks
//! the current status under a row lock, and commits the report, the row
//! update, the history entry, and the operation's side effects atomically.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (`PostgreSQL`, in-memory)
//!
//! # Modules
//!
//! - [`subtask`]: Sub-task lifecycle domain, engine, hooks, and adapters
//! - [`config`]: TOML and environment configuration
//! - [`logging`]: `tracing` subscriber setup

pub mod config;
pub mod logging;
pub mod subtask;
