//! Unit tests for the sub-task lifecycle.

mod support;
