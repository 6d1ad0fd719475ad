//! Outbox notifications written inside transition transactions.

use super::{NotificationId, SubTaskDomainError, SubTaskId, TaskId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of notification sent to a field user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// A sub-task was assigned to the recipient.
    SubTaskAssigned,
    /// The supervisor rejected the recipient's work.
    VerificationFailed,
    /// CGP rejected the recipient's work.
    CgpVerificationFailed,
    /// The customer canceled a sub-task the recipient owned.
    CanceledByCustomer,
}

impl NotificationKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SubTaskAssigned => "SUB_TASK_ASSIGNED",
            Self::VerificationFailed => "VERIFICATION_FAILED",
            Self::CgpVerificationFailed => "CGP_VERIFICATION_FAILED",
            Self::CanceledByCustomer => "CANCELED_BY_CUSTOMER",
        }
    }

    /// Returns the title template, rendered with the sub-task context.
    #[must_use]
    pub const fn title_template(self) -> &'static str {
        match self {
            Self::SubTaskAssigned => "New sub-task {{ sub_task_type }}",
            Self::VerificationFailed => "Verification failed for {{ sub_task_type }}",
            Self::CgpVerificationFailed => "CGP verification failed for {{ sub_task_type }}",
            Self::CanceledByCustomer => "Sub-task {{ sub_task_type }} canceled",
        }
    }

    /// Returns the body template, rendered with the sub-task context.
    #[must_use]
    pub const fn body_template(self) -> &'static str {
        match self {
            Self::SubTaskAssigned => concat!(
                "Sub-task {{ sub_task_uid }} for customer ",
                "{{ customer_number | default('-') }} is now assigned to you.",
            ),
            Self::VerificationFailed => concat!(
                "Report {{ report_code }} was rejected by {{ actor }}. ",
                "Please start fixing sub-task {{ sub_task_uid }}.",
            ),
            Self::CgpVerificationFailed => concat!(
                "Report {{ report_code }} was rejected by CGP. ",
                "Please start fixing sub-task {{ sub_task_uid }}.",
            ),
            Self::CanceledByCustomer => concat!(
                "The customer canceled sub-task {{ sub_task_uid }}. ",
                "No further work is needed.",
            ),
        }
    }
}

impl TryFrom<&str> for NotificationKind {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SUB_TASK_ASSIGNED" => Ok(Self::SubTaskAssigned),
            "VERIFICATION_FAILED" => Ok(Self::VerificationFailed),
            "CGP_VERIFICATION_FAILED" => Ok(Self::CgpVerificationFailed),
            "CANCELED_BY_CUSTOMER" => Ok(Self::CanceledByCustomer),
            _ => Err(SubTaskDomainError::UnknownNotificationKind(value.to_owned())),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification waiting in the outbox for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Row identifier.
    pub id: NotificationId,
    /// Recipient user.
    pub recipient: UserId,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Sub-task the notification is about.
    pub sub_task_id: SubTaskId,
    /// Parent task of that sub-task.
    pub task_id: TaskId,
    /// Rendered title.
    pub title: String,
    /// Rendered body.
    pub body: String,
    /// Key identifying the triggering event for at-most-once delivery.
    pub dedupe_key: String,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

/// Values for enqueueing a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Recipient user.
    pub recipient: UserId,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Sub-task the notification is about.
    pub sub_task_id: SubTaskId,
    /// Parent task of that sub-task.
    pub task_id: TaskId,
    /// Rendered title.
    pub title: String,
    /// Rendered body.
    pub body: String,
    /// Key identifying the triggering event.
    pub dedupe_key: String,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewNotification {
    /// Materializes the notification once storage has assigned its row id.
    #[must_use]
    pub fn into_notification(self, id: NotificationId) -> Notification {
        Notification {
            id,
            recipient: self.recipient,
            kind: self.kind,
            sub_task_id: self.sub_task_id,
            task_id: self.task_id,
            title: self.title,
            body: self.body,
            dedupe_key: self.dedupe_key,
            created_at: self.created_at,
        }
    }
}
