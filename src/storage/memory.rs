//! In-memory storage implementation for development and testing
//!
//! Keeps users, roles and assignments in process memory. Each operation
//! takes the write lock it needs for its whole check-and-insert, so the
//! uniqueness guarantees hold under concurrent callers.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{RoleStore, UserStore};
use crate::auth::user::{Role, RoleId, User, UserId};
use crate::error::{Result, RustyGateError};

#[derive(Default)]
struct UserTables {
    users: HashMap<UserId, User>,
    usernames: HashMap<String, UserId>, // username -> user_id
    emails: HashMap<String, UserId>,    // email -> user_id
}

#[derive(Default)]
struct RoleTables {
    roles: HashMap<RoleId, Role>,
    names: HashMap<String, RoleId>, // name -> role_id
    assignments: HashSet<(UserId, RoleId)>,
}

/// In-memory user and role store
#[derive(Clone, Default)]
pub struct MemoryStore {
    users: Arc<RwLock<UserTables>>,
    roles: Arc<RwLock<RoleTables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.users.read().await.users.len()
    }

    /// Number of stored assignments
    pub async fn assignment_count(&self) -> usize {
        self.roles.read().await.assignments.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let tables = self.users.read().await;
        Ok(tables.users.get(&user_id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let tables = self.users.read().await;
        Ok(tables
            .usernames
            .get(username)
            .and_then(|id| tables.users.get(id))
            .cloned())
    }

    async fn create(&self, user: User) -> Result<User> {
        let mut tables = self.users.write().await;

        // Check for conflicts
        if tables.usernames.contains_key(&user.username) {
            return Err(RustyGateError::DuplicateUsername(user.username));
        }
        if tables.emails.contains_key(&user.email) {
            return Err(RustyGateError::DuplicateEmail(user.email));
        }
        if tables.users.contains_key(&user.id) {
            return Err(RustyGateError::StorageError(format!(
                "User id {} already in use",
                user.id
            )));
        }

        tables.usernames.insert(user.username.clone(), user.id);
        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User> {
        let mut tables = self.users.write().await;

        let previous = tables
            .users
            .get(&user.id)
            .cloned()
            .ok_or_else(|| RustyGateError::UserNotFound(user.id.to_string()))?;

        if let Some(owner) = tables.usernames.get(&user.username) {
            if *owner != user.id {
                return Err(RustyGateError::DuplicateUsername(user.username));
            }
        }
        if let Some(owner) = tables.emails.get(&user.email) {
            if *owner != user.id {
                return Err(RustyGateError::DuplicateEmail(user.email));
            }
        }

        tables.usernames.remove(&previous.username);
        tables.emails.remove(&previous.email);
        tables.usernames.insert(user.username.clone(), user.id);
        tables.emails.insert(user.email.clone(), user.id);
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn replace_password_hash(&self, user_id: UserId, expected: &str, digest: String) -> Result<bool> {
        let mut tables = self.users.write().await;

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RustyGateError::UserNotFound(user_id.to_string()))?;

        if user.password_hash != expected {
            return Ok(false);
        }
        user.password_hash = digest;
        Ok(true)
    }

    async fn set_disabled(&self, user_id: UserId, disabled: bool) -> Result<bool> {
        let mut tables = self.users.write().await;

        let user = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| RustyGateError::UserNotFound(user_id.to_string()))?;

        Ok(std::mem::replace(&mut user.disabled, disabled))
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<Role>> {
        let tables = self.roles.read().await;
        Ok(tables
            .names
            .get(name)
            .and_then(|id| tables.roles.get(id))
            .cloned())
    }

    async fn get_by_id(&self, role_id: RoleId) -> Result<Option<Role>> {
        let tables = self.roles.read().await;
        Ok(tables.roles.get(&role_id).cloned())
    }

    async fn create(&self, role: Role) -> Result<Role> {
        let mut tables = self.roles.write().await;

        if tables.names.contains_key(&role.name) {
            return Err(RustyGateError::DuplicateRole(role.name));
        }

        tables.names.insert(role.name.clone(), role.id);
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn delete(&self, role_id: RoleId) -> Result<bool> {
        let mut tables = self.roles.write().await;

        match tables.roles.remove(&role_id) {
            Some(role) => {
                tables.names.remove(&role.name);
                tables.assignments.retain(|(_, rid)| *rid != role_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_all(&self) -> Result<Vec<Role>> {
        let tables = self.roles.read().await;
        let mut roles: Vec<Role> = tables.roles.values().cloned().collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn list_user_roles(&self, user_id: UserId) -> Result<Vec<Role>> {
        let tables = self.roles.read().await;
        let mut roles: Vec<Role> = tables
            .assignments
            .iter()
            .filter(|(uid, _)| *uid == user_id)
            .filter_map(|(_, rid)| tables.roles.get(rid))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn add_assignment(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
        let mut tables = self.roles.write().await;

        if !tables.roles.contains_key(&role_id) {
            return Err(RustyGateError::RoleNotFound(role_id.to_string()));
        }

        Ok(tables.assignments.insert((user_id, role_id)))
    }

    async fn remove_assignment(&self, user_id: UserId, role_id: RoleId) -> Result<bool> {
        let mut tables = self.roles.write().await;
        Ok(tables.assignments.remove(&(user_id, role_id)))
    }
}
