//! Identifier types for the sub-task domain.
//!
//! Row identifiers are database-assigned `BIGINT` keys; public identifiers
//! are UUIDs exposed to API consumers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a persisted row identifier.
            #[must_use]
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw row identifier.
            #[must_use]
            pub const fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! public_uid {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the wrapped UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<Uuid> for $name {
            fn as_ref(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

row_id!(
    /// Row identifier of a sub-task.
    SubTaskId
);
public_uid!(
    /// Public identifier of a sub-task.
    SubTaskUid
);
row_id!(
    /// Row identifier of a sub-task report.
    SubTaskReportId
);
public_uid!(
    /// Public identifier of a sub-task report.
    SubTaskReportUid
);
row_id!(
    /// Row identifier of a history ledger entry.
    HistoryItemId
);
row_id!(
    /// Row identifier of a parent task.
    TaskId
);
public_uid!(
    /// Public identifier of a parent task.
    TaskUid
);
row_id!(
    /// Row identifier of a user account.
    UserId
);
public_uid!(
    /// Public identifier of a user account.
    UserUid
);
row_id!(
    /// Row identifier of an organization.
    OrganizationId
);
public_uid!(
    /// Public identifier of an organization.
    OrganizationUid
);
row_id!(
    /// Row identifier of a role membership.
    RoleMembershipId
);
row_id!(
    /// Row identifier of an outbox notification.
    NotificationId
);

/// How a caller addressed a sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTaskLookup {
    /// Lookup by row identifier.
    Id(SubTaskId),
    /// Lookup by public identifier.
    Uid(SubTaskUid),
}

impl fmt::Display for SubTaskLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Uid(uid) => write!(f, "uid {uid}"),
        }
    }
}
