//! In-memory authorization directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::subtask::{
    domain::{
        AssignedScope, CodeHierarchy, EffectiveScope, RoleKind, RoleMembership,
        RoleMembershipId, UserId, UserRecord,
    },
    ports::{AuthorizationDirectory, DirectoryError, DirectoryResult},
};

/// Thread-safe in-memory directory of users, memberships, and scopes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<RwLock<DirectoryState>>,
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<UserId, UserRecord>,
    memberships: Vec<RoleMembership>,
    scopes: HashMap<RoleMembershipId, AssignedScope>,
    areas: CodeHierarchy,
    locations: CodeHierarchy,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sales area and location hierarchies.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Backend`] when the lock is poisoned.
    pub fn set_hierarchies(
        &self,
        areas: CodeHierarchy,
        locations: CodeHierarchy,
    ) -> DirectoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| DirectoryError::backend(std::io::Error::other(err.to_string())))?;
        state.areas = areas;
        state.locations = locations;
        Ok(())
    }

    /// Adds or replaces a user record.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Backend`] when the lock is poisoned.
    pub fn upsert_user(&self, user: UserRecord) -> DirectoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| DirectoryError::backend(std::io::Error::other(err.to_string())))?;
        state.users.insert(user.id, user);
        Ok(())
    }

    /// Adds a role membership with its assigned scope.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError::Backend`] when the lock is poisoned.
    pub fn add_membership(
        &self,
        membership: RoleMembership,
        scope: AssignedScope,
    ) -> DirectoryResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| DirectoryError::backend(std::io::Error::other(err.to_string())))?;
        state.scopes.insert(membership.id, scope);
        state.memberships.push(membership);
        Ok(())
    }
}

#[async_trait]
impl AuthorizationDirectory for InMemoryDirectory {
    async fn find_user(&self, user_id: UserId) -> DirectoryResult<Option<UserRecord>> {
        let state = self
            .state
            .read()
            .map_err(|err| DirectoryError::backend(std::io::Error::other(err.to_string())))?;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn memberships(
        &self,
        user_id: UserId,
        role: RoleKind,
    ) -> DirectoryResult<Vec<RoleMembership>> {
        let state = self
            .state
            .read()
            .map_err(|err| DirectoryError::backend(std::io::Error::other(err.to_string())))?;
        Ok(state
            .memberships
            .iter()
            .filter(|membership| membership.user_id == user_id && membership.role == role)
            .cloned()
            .collect())
    }

    async fn effective_scope(
        &self,
        membership: RoleMembershipId,
    ) -> DirectoryResult<EffectiveScope> {
        let state = self
            .state
            .read()
            .map_err(|err| DirectoryError::backend(std::io::Error::other(err.to_string())))?;
        let scope = state
            .scopes
            .get(&membership)
            .ok_or(DirectoryError::MembershipNotFound(membership))?;
        Ok(scope.expand(&state.areas, &state.locations))
    }
}
