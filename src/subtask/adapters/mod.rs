//! Adapter implementations for sub-task lifecycle ports.

pub mod memory;
pub mod postgres;
