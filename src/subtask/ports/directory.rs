//! Read-only port onto users, role memberships, and effective scopes.

use crate::subtask::domain::{
    EffectiveScope, RoleKind, RoleMembership, RoleMembershipId, UserId, UserRecord,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory lookups.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Source of identities the authorization policy checks against.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthorizationDirectory: Send + Sync {
    /// Finds a user account, including soft-deleted ones.
    async fn find_user(&self, user_id: UserId) -> DirectoryResult<Option<UserRecord>>;

    /// Lists the user's memberships of the given role kind.
    async fn memberships(
        &self,
        user_id: UserId,
        role: RoleKind,
    ) -> DirectoryResult<Vec<RoleMembership>>;

    /// Returns the membership's scope after expanding assigned areas and
    /// locations along their hierarchies.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::MembershipNotFound`] for an unknown
    /// membership.
    async fn effective_scope(&self, membership: RoleMembershipId)
    -> DirectoryResult<EffectiveScope>;
}

/// Errors returned by directory implementations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// The membership does not exist.
    #[error("role membership not found: {0}")]
    MembershipNotFound(RoleMembershipId),

    /// Backend failure.
    #[error("directory error: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a backend error.
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}
