//! Sub-task lifecycle state engine.
//!
//! Every status change of a field-service sub-task goes through
//! [`services::StateEngine`]: it authorizes the actor, checks the status
//! under a row lock, writes the report, the updated row and the history
//! entry, runs the operation's hook, and commits all of it or nothing. The
//! module follows hexagonal architecture:
//!
//! - Domain types and the transition table in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]
//! - Built-in transition hooks in [`hooks`]

pub mod adapters;
pub mod domain;
pub mod hooks;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
