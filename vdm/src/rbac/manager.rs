//! Role mutation manager.

use std::sync::Arc;

use super::errors::{RoleError, RoleResult};
use super::models::RoleName;
use crate::auth::{User, UserId};
use crate::db::AuthRepository;

/// Default minimum length of a public user tag
pub const DEFAULT_MIN_TAG_LENGTH: usize = 6;

/// Role manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbacConfig {
    /// Tags shorter than this are rejected before any lookup
    pub min_tag_length: usize,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            min_tag_length: DEFAULT_MIN_TAG_LENGTH,
        }
    }
}

/// Grants and revokes non-administrator roles
#[derive(Clone)]
pub struct RoleManager {
    repo: Arc<dyn AuthRepository>,
    config: RbacConfig,
}

impl RoleManager {
    pub fn new(repo: Arc<dyn AuthRepository>, config: RbacConfig) -> Self {
        Self { repo, config }
    }

    /// Grant `role_name` to the user identified by `tag`
    ///
    /// # Errors
    ///
    /// * `RoleError::InvalidInput` - Short tag, unknown role or `ADMIN`
    /// * `RoleError::UserNotFound` - No user with this tag
    /// * `RoleError::AlreadyGranted` - Role already held, including a lost race
    pub async fn grant_role(&self, tag: &str, role_name: &str) -> RoleResult<()> {
        let role = self.validate(tag, role_name)?;
        let user = self.find_user(tag).await?;

        if user.has_role(role) {
            return Err(RoleError::AlreadyGranted {
                tag: tag.to_string(),
                role,
            });
        }

        if !self.repo.create_user_role(user.id, role).await? {
            return Err(RoleError::AlreadyGranted {
                tag: tag.to_string(),
                role,
            });
        }

        log::info!("Granted role {role} to user {}", user.id);
        Ok(())
    }

    /// Revoke `role_name` from the user identified by `tag`
    ///
    /// # Errors
    ///
    /// * `RoleError::InvalidInput` - Short tag, unknown role or `ADMIN`
    /// * `RoleError::UserNotFound` - No user with this tag
    /// * `RoleError::AdminProtected` - Target is an administrator
    /// * `RoleError::NotGranted` - Role not held, including a lost race
    pub async fn revoke_role(&self, tag: &str, role_name: &str) -> RoleResult<()> {
        let role = self.validate(tag, role_name)?;
        let user = self.find_user(tag).await?;

        if user.has_role(RoleName::Admin) {
            return Err(RoleError::AdminProtected(tag.to_string()));
        }

        if !user.has_role(role) || !self.repo.delete_user_role(user.id, role).await? {
            return Err(RoleError::NotGranted {
                tag: tag.to_string(),
                role,
            });
        }

        log::info!("Revoked role {role} from user {}", user.id);
        Ok(())
    }

    /// Look up a user and their roles by tag
    pub async fn find_user(&self, tag: &str) -> RoleResult<User> {
        self.repo
            .find_user_by_tag(tag)
            .await?
            .ok_or_else(|| RoleError::UserNotFound(tag.to_string()))
    }

    /// Roles currently held by a user
    pub async fn roles_of(&self, user_id: UserId) -> RoleResult<Vec<RoleName>> {
        Ok(self.repo.find_roles(user_id).await?)
    }

    fn validate(&self, tag: &str, role_name: &str) -> RoleResult<RoleName> {
        if tag.chars().count() < self.config.min_tag_length {
            return Err(RoleError::InvalidInput);
        }

        match role_name.parse::<RoleName>() {
            Ok(role) if !role.is_admin() => Ok(role),
            _ => Err(RoleError::InvalidInput),
        }
    }
}
