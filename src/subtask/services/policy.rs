//! Role- and ownership-aware authorization of transition actors.

use super::{AuthorizationError, TransitionError};
use crate::subtask::{
    domain::{
        Actor, ActorRef, ActorSnapshot, RoleKind, RoleMembership, ScopeDimension, SubTask,
        UserId, UserRecord, UserStatus,
    },
    ports::AuthorizationDirectory,
};
use std::sync::Arc;

/// Identity the engine records for an authorized actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizedActor {
    /// Snapshot stored on the report and history entry.
    pub snapshot: ActorSnapshot,
    /// Field executor whose ownership must still hold under the row lock.
    pub owner_guard: Option<UserId>,
}

impl AuthorizedActor {
    /// Returns the authorization used for system-driven steps.
    #[must_use]
    pub fn system() -> Self {
        Self {
            snapshot: ActorSnapshot::system(),
            owner_guard: None,
        }
    }
}

/// Decides whether an actor may drive a transition on a sub-task.
///
/// The decision depends on the actor and the sub-task snapshot only, never
/// on the operation being attempted. Nothing is written.
#[derive(Clone)]
pub struct AuthorizationPolicy<D>
where
    D: AuthorizationDirectory,
{
    directory: Arc<D>,
}

impl<D> AuthorizationPolicy<D>
where
    D: AuthorizationDirectory,
{
    /// Creates a policy backed by the given directory.
    #[must_use]
    pub const fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Authorizes `actor` for an operation requiring `role` on `sub_task`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Authorization`] with the specific reason,
    /// [`TransitionError::InternalConsistency`] when the sub-task lacks data
    /// the check needs, or [`TransitionError::Directory`] on lookup failure.
    pub async fn authorize(
        &self,
        actor: Actor,
        role: RoleKind,
        sub_task: &SubTask,
    ) -> Result<AuthorizedActor, TransitionError> {
        let Actor::User(user_id) = actor else {
            if role.requires_membership() {
                return Err(AuthorizationError::SystemActorNotPermitted(role).into());
            }
            return Ok(AuthorizedActor {
                snapshot: ActorSnapshot {
                    role,
                    ..ActorSnapshot::system()
                },
                owner_guard: None,
            });
        };

        let user = self.active_user(user_id).await?;
        match role {
            RoleKind::FieldExecutor => self.authorize_field_executor(&user, sub_task).await,
            RoleKind::FieldSupervisor => self.authorize_supervisor(&user, sub_task).await,
            RoleKind::Cgp | RoleKind::Admin => {
                let membership = self.first_membership(&user, role).await?;
                Ok(AuthorizedActor {
                    snapshot: ActorSnapshot::from_user(&user, Some(membership.organization), role),
                    owner_guard: None,
                })
            }
            RoleKind::Any | RoleKind::None => Ok(AuthorizedActor {
                snapshot: ActorSnapshot::from_user(&user, None, role),
                owner_guard: None,
            }),
        }
    }

    /// Resolves the user an administrator assigns as field executor.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::AssigneeNotFieldExecutor`] unless the
    /// user is active and holds a field-executor membership.
    pub async fn resolve_assignee(&self, user_id: UserId) -> Result<ActorRef, TransitionError> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .filter(|user| !user.is_deleted && user.status == UserStatus::Active)
            .ok_or(AuthorizationError::AssigneeNotFieldExecutor(user_id))?;
        let memberships = self
            .directory
            .memberships(user_id, RoleKind::FieldExecutor)
            .await?;
        if memberships.is_empty() {
            return Err(AuthorizationError::AssigneeNotFieldExecutor(user_id).into());
        }
        Ok(user.as_actor_ref())
    }

    async fn active_user(&self, user_id: UserId) -> Result<UserRecord, TransitionError> {
        let user = self
            .directory
            .find_user(user_id)
            .await?
            .ok_or(AuthorizationError::UserNotFound(user_id))?;
        if user.is_deleted {
            return Err(AuthorizationError::UserDeleted(user_id).into());
        }
        if user.status != UserStatus::Active {
            return Err(AuthorizationError::UserInactive(user_id).into());
        }
        Ok(user)
    }

    async fn first_membership(
        &self,
        user: &UserRecord,
        role: RoleKind,
    ) -> Result<RoleMembership, TransitionError> {
        self.directory
            .memberships(user.id, role)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                AuthorizationError::MissingRole {
                    user_id: user.id,
                    role,
                }
                .into()
            })
    }

    async fn authorize_field_executor(
        &self,
        user: &UserRecord,
        sub_task: &SubTask,
    ) -> Result<AuthorizedActor, TransitionError> {
        let membership = self.first_membership(user, RoleKind::FieldExecutor).await?;
        check_ownership(user.id, sub_task)?;
        Ok(AuthorizedActor {
            snapshot: ActorSnapshot::from_user(
                user,
                Some(membership.organization),
                RoleKind::FieldExecutor,
            ),
            owner_guard: Some(user.id),
        })
    }

    async fn authorize_supervisor(
        &self,
        user: &UserRecord,
        sub_task: &SubTask,
    ) -> Result<AuthorizedActor, TransitionError> {
        let memberships = self
            .directory
            .memberships(user.id, RoleKind::FieldSupervisor)
            .await?;
        if memberships.is_empty() {
            return Err(AuthorizationError::MissingRole {
                user_id: user.id,
                role: RoleKind::FieldSupervisor,
            }
            .into());
        }
        let customer = sub_task.customer_scope().ok_or_else(|| {
            TransitionError::internal(format!(
                "sub-task {} lacks the customer area or location codes",
                sub_task.id()
            ))
        })?;

        let mut closest = ScopeDimension::NoExpertise;
        for membership in memberships {
            let scope = self.directory.effective_scope(membership.id).await?;
            match scope.covers(&customer) {
                Ok(()) => {
                    return Ok(AuthorizedActor {
                        snapshot: ActorSnapshot::from_user(
                            user,
                            Some(membership.organization),
                            RoleKind::FieldSupervisor,
                        ),
                        owner_guard: None,
                    });
                }
                Err(dimension) => closest = closest.max(dimension),
            }
        }
        Err(AuthorizationError::ScopeMismatch {
            user_id: user.id,
            dimension: closest,
        }
        .into())
    }
}

/// Checks that `user_id` owns the sub-task, or that it is still open.
///
/// Runs once against the snapshot during authorization and again against
/// the locked row inside the transaction.
pub(crate) fn check_ownership(user_id: UserId, sub_task: &SubTask) -> Result<(), TransitionError> {
    match sub_task.last_field_executor() {
        Some(owner) if owner.user_id == user_id => Ok(()),
        Some(owner) => Err(AuthorizationError::NotOwner {
            user_id,
            owner: owner.user_id,
        }
        .into()),
        None if sub_task.status().is_pre_assignment() => Ok(()),
        None => Err(TransitionError::internal(format!(
            "sub-task {} is {} but has no field executor",
            sub_task.id(),
            sub_task.status()
        ))),
    }
}
