//! Actors, role kinds, and identity snapshots.

use super::{OrganizationId, OrganizationUid, RoleMembershipId, SubTaskDomainError, UserId, UserUid};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Login and display name recorded for system-driven transitions.
pub const SYSTEM_IDENTITY: &str = "SYSTEM";

/// Role kind an operation requires of its actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleKind {
    /// Field executor doing the on-site work.
    FieldExecutor,
    /// Field supervisor verifying work within a scope.
    FieldSupervisor,
    /// External verifying party.
    Cgp,
    /// Back-office administrator.
    Admin,
    /// Any identified or system actor.
    Any,
    /// No actor identity is checked.
    None,
}

impl RoleKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FieldExecutor => "FIELD_EXECUTOR",
            Self::FieldSupervisor => "FIELD_SUPERVISOR",
            Self::Cgp => "CGP",
            Self::Admin => "ADMIN",
            Self::Any => "ANY",
            Self::None => "NONE",
        }
    }

    /// Returns `true` when the role demands a role membership.
    #[must_use]
    pub const fn requires_membership(self) -> bool {
        !matches!(self, Self::Any | Self::None)
    }
}

impl TryFrom<&str> for RoleKind {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "FIELD_EXECUTOR" => Ok(Self::FieldExecutor),
            "FIELD_SUPERVISOR" => Ok(Self::FieldSupervisor),
            "CGP" => Ok(Self::Cgp),
            "ADMIN" => Ok(Self::Admin),
            "ANY" | "*" => Ok(Self::Any),
            "NONE" | "-" => Ok(Self::None),
            _ => Err(SubTaskDomainError::UnknownRoleKind(value.to_owned())),
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is driving a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actor {
    /// The dispatcher itself, e.g. a requeue or a cascade.
    System,
    /// An identified user account.
    User(UserId),
}

impl Actor {
    /// Returns the user identifier for user actors.
    #[must_use]
    pub const fn user_id(self) -> Option<UserId> {
        match self {
            Self::System => None,
            Self::User(id) => Some(id),
        }
    }
}

/// Organization a role membership belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    /// Organization row identifier.
    pub id: OrganizationId,
    /// Organization public identifier.
    pub uid: OrganizationUid,
    /// Organization display name.
    pub name: String,
}

/// Compact user reference stored on a sub-task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    /// User row identifier.
    pub user_id: UserId,
    /// User public identifier.
    pub user_uid: UserUid,
    /// Login name.
    pub loginid: String,
    /// Display name.
    pub fullname: String,
}

/// Identity captured on each report and history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorSnapshot {
    /// User row identifier; absent for system actors.
    pub user_id: Option<UserId>,
    /// User public identifier; absent for system actors.
    pub user_uid: Option<UserUid>,
    /// Login name.
    pub loginid: String,
    /// Display name.
    pub fullname: String,
    /// Phone number, when known.
    pub phone: Option<String>,
    /// Organization the actor acted for, when known.
    pub organization: Option<OrganizationRef>,
    /// Role kind the actor was authorized under.
    pub role: RoleKind,
}

impl ActorSnapshot {
    /// Returns the snapshot recorded for system-driven transitions.
    #[must_use]
    pub fn system() -> Self {
        Self {
            user_id: None,
            user_uid: None,
            loginid: SYSTEM_IDENTITY.to_owned(),
            fullname: SYSTEM_IDENTITY.to_owned(),
            phone: None,
            organization: None,
            role: RoleKind::None,
        }
    }

    /// Builds a snapshot from a directory user record.
    #[must_use]
    pub fn from_user(
        user: &UserRecord,
        organization: Option<OrganizationRef>,
        role: RoleKind,
    ) -> Self {
        Self {
            user_id: Some(user.id),
            user_uid: Some(user.uid),
            loginid: user.loginid.clone(),
            fullname: user.fullname.clone(),
            phone: user.phone.clone(),
            organization,
            role,
        }
    }

    /// Returns the compact reference for user actors.
    #[must_use]
    pub fn as_actor_ref(&self) -> Option<ActorRef> {
        match (self.user_id, self.user_uid) {
            (Some(user_id), Some(user_uid)) => Some(ActorRef {
                user_id,
                user_uid,
                loginid: self.loginid.clone(),
                fullname: self.fullname.clone(),
            }),
            _ => None,
        }
    }

    /// Returns `true` for the system snapshot.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Account state of a directory user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// The account may act.
    Active,
    /// The account is suspended.
    Inactive,
}

/// User account as resolved by the authorization directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    /// User row identifier.
    pub id: UserId,
    /// User public identifier.
    pub uid: UserUid,
    /// Login name.
    pub loginid: String,
    /// Display name.
    pub fullname: String,
    /// Phone number, when known.
    pub phone: Option<String>,
    /// Account state.
    pub status: UserStatus,
    /// Soft-delete flag.
    pub is_deleted: bool,
}

impl UserRecord {
    /// Returns the compact reference used for sub-task ownership.
    #[must_use]
    pub fn as_actor_ref(&self) -> ActorRef {
        ActorRef {
            user_id: self.id,
            user_uid: self.uid,
            loginid: self.loginid.clone(),
            fullname: self.fullname.clone(),
        }
    }
}

/// Membership of a user in a role within an organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMembership {
    /// Membership row identifier.
    pub id: RoleMembershipId,
    /// Member user.
    pub user_id: UserId,
    /// Role held.
    pub role: RoleKind,
    /// Organization the role is held in.
    pub organization: OrganizationRef,
}
