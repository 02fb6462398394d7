use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;
pub type RoleId = Uuid;

/// A registered account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: UserId,
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Argon2 PHC digest, never the plaintext
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// Disabled accounts cannot log in or pass the guard
    pub disabled: bool,
    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates an enabled user with a fresh identifier
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            disabled: false,
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.disabled
    }
}

/// A named role users can hold
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: String,
}

impl Role {
    pub fn new(name: String, description: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description,
        }
    }
}

/// A (user, role) assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role_id: RoleId,
}
