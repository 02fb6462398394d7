//! Role management and role predicates
//!
//! Roles are flat: holding `superadmin` does not imply holding `admin`. The
//! only place the two meet is the [`Privilege`] table consulted by
//! [`is_admin`].

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auth::user::{Role, RoleId, UserId};
use crate::constants::{ADMIN_ROLE, MAX_ROLE_NAME_LENGTH, SUPERADMIN_ROLE};
use crate::error::{Result, RustyGateError};
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::{RoleStore, UserStore};

/// Names of the roles a user holds
pub type RoleSet = BTreeSet<String>;

/// Privilege levels encoded by role names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Privilege {
    Admin,
    SuperAdmin,
}

impl Privilege {
    /// Role name granting this privilege
    pub fn role_name(&self) -> &'static str {
        match self {
            Privilege::Admin => ADMIN_ROLE,
            Privilege::SuperAdmin => SUPERADMIN_ROLE,
        }
    }
}

/// Privileges accepted by `is_admin`
pub const ADMIN_PRIVILEGES: &[Privilege] = &[Privilege::Admin, Privilege::SuperAdmin];

/// True iff the user holds at least one required role
pub fn has_any<S: AsRef<str>>(user_roles: &RoleSet, required: &[S]) -> bool {
    required.iter().any(|role| user_roles.contains(role.as_ref()))
}

/// True iff the user holds every required role
pub fn has_all<S: AsRef<str>>(user_roles: &RoleSet, required: &[S]) -> bool {
    required.iter().all(|role| user_roles.contains(role.as_ref()))
}

/// True iff the user holds a role from the admin privilege table
pub fn is_admin(user_roles: &RoleSet) -> bool {
    ADMIN_PRIVILEGES
        .iter()
        .any(|privilege| user_roles.contains(privilege.role_name()))
}

/// What a guarded operation demands of the caller's roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleRequirement {
    /// Any authenticated, active user
    Authenticated,
    /// At least one of the listed roles
    Any(Vec<String>),
    /// Every listed role
    All(Vec<String>),
    /// admin or superadmin
    Admin,
}

impl RoleRequirement {
    pub fn any<S: Into<String>>(roles: impl IntoIterator<Item = S>) -> Self {
        RoleRequirement::Any(roles.into_iter().map(Into::into).collect())
    }

    pub fn all<S: Into<String>>(roles: impl IntoIterator<Item = S>) -> Self {
        RoleRequirement::All(roles.into_iter().map(Into::into).collect())
    }

    /// Whether role lookups are needed to evaluate this requirement
    pub fn needs_roles(&self) -> bool {
        !matches!(self, RoleRequirement::Authenticated)
    }

    pub fn is_satisfied_by(&self, user_roles: &RoleSet) -> bool {
        match self {
            RoleRequirement::Authenticated => true,
            RoleRequirement::Any(required) => has_any(user_roles, required.as_slice()),
            RoleRequirement::All(required) => has_all(user_roles, required.as_slice()),
            RoleRequirement::Admin => is_admin(user_roles),
        }
    }

    /// Short description for logs
    pub fn describe(&self) -> String {
        match self {
            RoleRequirement::Authenticated => "authenticated".to_string(),
            RoleRequirement::Any(roles) => format!("any of [{}]", roles.join(", ")),
            RoleRequirement::All(roles) => format!("all of [{}]", roles.join(", ")),
            RoleRequirement::Admin => "admin".to_string(),
        }
    }
}

/// Manages role definitions and user/role assignments
#[derive(Clone)]
pub struct RoleEngine {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
}

impl RoleEngine {
    pub fn new(roles: Arc<dyn RoleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { roles, users }
    }

    /// Creates a role; the store rejects duplicate names
    pub async fn create_role(&self, name: &str, description: &str) -> Result<Role> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RustyGateError::ValidationError(
                "Role name must not be empty".to_string(),
            ));
        }
        if name.len() > MAX_ROLE_NAME_LENGTH {
            return Err(RustyGateError::ValidationError(format!(
                "Role name must be at most {} characters",
                MAX_ROLE_NAME_LENGTH
            )));
        }

        let role = self
            .roles
            .create(Role::new(name.to_string(), description.to_string()))
            .await?;
        log::info!("Created role '{}' ({})", role.name, role.id);
        Ok(role)
    }

    pub async fn get_role(&self, name: &str) -> Result<Option<Role>> {
        self.roles.get_by_name(name.trim()).await
    }

    pub async fn get_role_by_id(&self, role_id: RoleId) -> Result<Option<Role>> {
        self.roles.get_by_id(role_id).await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>> {
        self.roles.list_all().await
    }

    /// Deletes a role together with its assignments
    pub async fn delete_role(&self, role_id: RoleId) -> Result<()> {
        if !self.roles.delete(role_id).await? {
            return Err(RustyGateError::RoleNotFound(role_id.to_string()));
        }
        log::info!("Deleted role {}", role_id);
        Ok(())
    }

    /// Grants a role. Returns false if the user already held it.
    pub async fn assign_role_to_user(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
        if self.users.get_by_id(user_id).await?.is_none() {
            return Err(RustyGateError::UserNotFound(user_id.to_string()));
        }
        let role = self
            .roles
            .get_by_id(role_id)
            .await?
            .ok_or_else(|| RustyGateError::RoleNotFound(role_id.to_string()))?;

        // The store's insert decides idempotence, not the lookups above
        let created = self.roles.add_assignment(user_id, role_id).await?;
        if created {
            log_security_event(&SecurityEvent::RoleAssigned {
                user_id,
                role: role.name,
            });
        } else {
            log::debug!("User {} already holds role {}", user_id, role.name);
        }
        Ok(created)
    }

    /// Removes a role from a user. Returns false if the user never held it.
    pub async fn revoke_role_from_user(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
        let removed = self.roles.remove_assignment(user_id, role_id).await?;
        if removed {
            log_security_event(&SecurityEvent::RoleRevoked { user_id, role_id });
        }
        Ok(removed)
    }

    /// Each role the user holds, once, sorted by name
    pub async fn get_user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        let mut seen = HashSet::new();
        let mut roles = self.roles.list_user_roles(user_id).await?;
        roles.retain(|role| seen.insert(role.id));
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    /// Names of the roles the user holds right now
    pub async fn get_user_role_names(&self, user_id: UserId) -> Result<RoleSet> {
        Ok(self
            .roles
            .list_user_roles(user_id)
            .await?
            .into_iter()
            .map(|role| role.name)
            .collect())
    }

    /// Creates every missing role from `(name, description)` pairs and
    /// returns the ones this call created
    pub async fn ensure_roles(&self, definitions: &[(&str, &str)]) -> Result<Vec<Role>> {
        let mut created = Vec::new();
        for (name, description) in definitions {
            let name = name.trim();
            if self.roles.get_by_name(name).await?.is_some() {
                continue;
            }
            match self.create_role(name, description).await {
                Ok(role) => created.push(role),
                // Someone else created it in between
                Err(RustyGateError::DuplicateRole(_)) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(created)
    }
}
