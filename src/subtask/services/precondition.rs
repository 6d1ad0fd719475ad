//! Status precondition checks.

use super::StateConflictError;
use crate::subtask::domain::{SubTaskDomainError, SubTaskStatus};

/// Rejects malformed transition declarations before any transaction opens.
///
/// # Errors
///
/// Returns [`SubTaskDomainError::EmptyOperationLabel`] or
/// [`SubTaskDomainError::EmptySourceSet`].
pub fn ensure_declared(label: &str, allowed: &[SubTaskStatus]) -> Result<(), SubTaskDomainError> {
    if label.trim().is_empty() {
        return Err(SubTaskDomainError::EmptyOperationLabel);
    }
    if allowed.is_empty() {
        return Err(SubTaskDomainError::EmptySourceSet(label.to_owned()));
    }
    Ok(())
}

/// Checks the status read under lock against the allowed set.
///
/// # Errors
///
/// Returns [`StateConflictError::StatusNotAllowed`] carrying the operation,
/// the actual status and the allowed set.
pub fn ensure_allowed(
    label: &str,
    current: SubTaskStatus,
    allowed: &[SubTaskStatus],
) -> Result<(), StateConflictError> {
    if allowed.contains(&current) {
        return Ok(());
    }
    Err(StateConflictError::StatusNotAllowed {
        operation: label.to_owned(),
        current,
        allowed: allowed.to_vec(),
    })
}
