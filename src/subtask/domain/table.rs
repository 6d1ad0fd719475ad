//! Declarative transition table and its static audit.

use super::{Operation, SubTaskStatus, TransitionRule, TransitionTarget};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;

/// Defect found while auditing a transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableIssue {
    /// The same operation is declared more than once with differing rules.
    DuplicateOperation(Operation),
    /// The operation declares no source statuses.
    EmptySources(Operation),
    /// The operation re-enters one of its sources without being declared
    /// in-place.
    UndeclaredSelfLoop {
        /// Offending operation.
        operation: Operation,
        /// Status that is both a source and the target.
        status: SubTaskStatus,
    },
    /// Two operations sharing a label and role lead from the same status to
    /// different targets.
    ConflictingLabel {
        /// Shared label.
        label: &'static str,
        /// Shared source status.
        status: SubTaskStatus,
        /// Distinct targets reached from it.
        targets: (TransitionTarget, TransitionTarget),
    },
    /// A terminal status has an outgoing edge.
    TerminalExit {
        /// Offending operation.
        operation: Operation,
        /// Terminal source status.
        status: SubTaskStatus,
    },
}

impl fmt::Display for TableIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateOperation(operation) => {
                write!(f, "{operation} is declared more than once")
            }
            Self::EmptySources(operation) => write!(f, "{operation} has no source statuses"),
            Self::UndeclaredSelfLoop { operation, status } => {
                write!(f, "{operation} re-enters {status} without being in-place")
            }
            Self::ConflictingLabel {
                label,
                status,
                targets,
            } => write!(
                f,
                "{label} leads from {status} to both {} and {}",
                targets.0, targets.1
            ),
            Self::TerminalExit { operation, status } => {
                write!(f, "{operation} leaves terminal status {status}")
            }
        }
    }
}

/// Result of [`TransitionTable::audit`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableAudit {
    /// Statuses no chain of operations reaches from an initial status.
    pub unreachable: Vec<SubTaskStatus>,
    /// Contradictions and malformed rules.
    pub issues: Vec<TableIssue>,
}

impl TableAudit {
    /// Returns `true` when the audit found nothing.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.unreachable.is_empty() && self.issues.is_empty()
    }
}

/// The full set of declared transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    rules: Vec<TransitionRule>,
}

impl TransitionTable {
    /// Builds the table from the operation catalogue.
    #[must_use]
    pub fn standard() -> Self {
        Self::from_rules(Operation::catalogue().into_iter().map(Operation::rule))
    }

    /// Builds a table from explicit rules.
    #[must_use]
    pub fn from_rules(rules: impl IntoIterator<Item = TransitionRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    /// Returns the declared rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[TransitionRule] {
        &self.rules
    }

    /// Returns the first rule declared for `operation`.
    #[must_use]
    pub fn rule(&self, operation: Operation) -> Option<&TransitionRule> {
        self.rules.iter().find(|rule| rule.operation == operation)
    }

    /// Returns the statuses `status` can move to in one step.
    #[must_use]
    pub fn successors(&self, status: SubTaskStatus) -> BTreeSet<SubTaskStatus> {
        self.rules
            .iter()
            .filter(|rule| rule.allows(status))
            .map(|rule| rule.target.resolve(status))
            .collect()
    }

    /// Checks reachability and internal consistency.
    #[must_use]
    pub fn audit(&self) -> TableAudit {
        let mut issues = Vec::new();
        self.check_rules(&mut issues);
        self.check_labels(&mut issues);
        TableAudit {
            unreachable: self.unreachable(),
            issues,
        }
    }

    fn unreachable(&self) -> Vec<SubTaskStatus> {
        let mut seen: BTreeSet<SubTaskStatus> = SubTaskStatus::INITIAL.into_iter().collect();
        let mut queue: VecDeque<SubTaskStatus> = SubTaskStatus::INITIAL.into_iter().collect();
        while let Some(status) = queue.pop_front() {
            for next in self.successors(status) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        SubTaskStatus::ALL
            .into_iter()
            .filter(|status| !seen.contains(status))
            .collect()
    }

    fn check_rules(&self, issues: &mut Vec<TableIssue>) {
        let mut reported = Vec::new();
        for (index, rule) in self.rules.iter().enumerate() {
            let duplicated = self
                .rules
                .iter()
                .skip(index.saturating_add(1))
                .any(|other| other.operation == rule.operation && other != rule);
            if duplicated && !reported.contains(&rule.operation) {
                reported.push(rule.operation);
                issues.push(TableIssue::DuplicateOperation(rule.operation));
            }

            if rule.allowed_sources.is_empty() {
                issues.push(TableIssue::EmptySources(rule.operation));
            }

            for &status in &rule.allowed_sources {
                if rule.target == TransitionTarget::Status(status) && !rule.in_place {
                    issues.push(TableIssue::UndeclaredSelfLoop {
                        operation: rule.operation,
                        status,
                    });
                }
                let terminal_exit = status.is_terminal()
                    && status != SubTaskStatus::CanceledByFieldExecutor
                    && !rule.in_place;
                if terminal_exit {
                    issues.push(TableIssue::TerminalExit {
                        operation: rule.operation,
                        status,
                    });
                }
            }
        }
    }

    fn check_labels(&self, issues: &mut Vec<TableIssue>) {
        // Reason-parameterized operations share a label by construction.
        let plain: Vec<&TransitionRule> = self
            .rules
            .iter()
            .filter(|rule| rule.operation.reason().is_none())
            .collect();
        for (index, rule) in plain.iter().enumerate() {
            for other in plain.iter().skip(index.saturating_add(1)) {
                if rule.operation == other.operation
                    || rule.operation.label() != other.operation.label()
                    || rule.required_role != other.required_role
                {
                    continue;
                }
                for &status in &rule.allowed_sources {
                    if !other.allows(status) {
                        continue;
                    }
                    let targets = (rule.target, other.target);
                    if targets.0.resolve(status) != targets.1.resolve(status) {
                        issues.push(TableIssue::ConflictingLabel {
                            label: rule.operation.label(),
                            status,
                            targets,
                        });
                    }
                }
            }
        }
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}
