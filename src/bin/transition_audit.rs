//! Audits the sub-task transition table and its hook bindings.
//!
//! Usage:
//!
//! ```text
//! TASK_DISPATCHER_CONFIG=task-dispatcher.toml transition_audit
//! ```
//!
//! Every finding is logged. The process exits with status 1 when the table
//! has unreachable statuses or contradictions, or a hook is bound to an
//! operation the table does not declare, and with status 2 when the
//! configuration or logging cannot be set up.

use std::process::ExitCode;
use task_dispatcher::config::{self, DispatcherConfig};
use task_dispatcher::logging;
use task_dispatcher::subtask::services::TransitionRegistry;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    let loaded = DispatcherConfig::load(&config::config_path(std::env::vars()));
    let logging_config = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    if logging::init(&logging_config).is_err() {
        return ExitCode::from(2);
    }
    if let Err(err) = loaded {
        error!(error = %err, "failed to load configuration");
        return ExitCode::from(2);
    }

    let registry = TransitionRegistry::standard();
    let (audit, orphaned) = registry.validate();
    for status in &audit.unreachable {
        warn!(%status, "status is unreachable from any initial status");
    }
    for issue in &audit.issues {
        warn!(%issue, "transition table issue");
    }
    for operation in &orphaned {
        warn!(%operation, "hook bound to an undeclared operation");
    }

    if audit.is_clean() && orphaned.is_empty() {
        info!(
            operations = registry.table().rules().len(),
            "transition table is consistent"
        );
        ExitCode::SUCCESS
    } else {
        error!(
            unreachable = audit.unreachable.len(),
            issues = audit.issues.len(),
            orphaned_hooks = orphaned.len(),
            "transition table audit failed"
        );
        ExitCode::FAILURE
    }
}
