//! Abstract storage interfaces for pluggable backends
//!
//! The core reaches persistence only through these traits. Every call may
//! run concurrently with other callers, so uniqueness and idempotence are
//! decided by the backend's own insert, never by a prior lookup.

use async_trait::async_trait;

use crate::auth::user::{Role, RoleId, User, UserId};
use crate::error::Result;

/// User data storage interface
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get user by ID
    async fn get_by_id(&self, user_id: UserId) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Create a new user.
    /// Fails with `DuplicateUsername` or `DuplicateEmail` on collision.
    async fn create(&self, user: User) -> Result<User>;

    /// Replace a stored user.
    /// Fails with `UserNotFound` if absent, or a duplicate error if the new
    /// username/email belongs to someone else.
    async fn update(&self, user: User) -> Result<User>;

    /// Swap the password digest only if the stored one still equals
    /// `expected`. Returns false, and writes nothing, if it changed meanwhile.
    /// Other fields are left untouched. Fails with `UserNotFound` if absent.
    async fn replace_password_hash(&self, user_id: UserId, expected: &str, digest: String) -> Result<bool>;

    /// Set the disabled flag, leaving every other field untouched.
    /// Returns the previous flag. Fails with `UserNotFound` if absent.
    async fn set_disabled(&self, user_id: UserId, disabled: bool) -> Result<bool>;
}

/// Role and assignment storage interface
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Get role by unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<Role>>;

    /// Get role by ID
    async fn get_by_id(&self, role_id: RoleId) -> Result<Option<Role>>;

    /// Create a role. Fails with `DuplicateRole` if the name is taken.
    async fn create(&self, role: Role) -> Result<Role>;

    /// Delete a role and all of its assignments; false if it did not exist
    async fn delete(&self, role_id: RoleId) -> Result<bool>;

    /// All roles
    async fn list_all(&self) -> Result<Vec<Role>>;

    /// Roles currently assigned to a user, in no particular order
    async fn list_user_roles(&self, user_id: UserId) -> Result<Vec<Role>>;

    /// Insert an assignment; false if the pair already existed.
    /// Fails with `RoleNotFound` if the role no longer exists.
    async fn add_assignment(&self, user_id: UserId, role_id: RoleId) -> Result<bool>;

    /// Remove an assignment; false if the pair did not exist
    async fn remove_assignment(&self, user_id: UserId, role_id: RoleId) -> Result<bool>;
}
