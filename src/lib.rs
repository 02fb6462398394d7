//! Rusty Gate - Authentication and role-based access control core
//!
//! This library provides password hashing, access/refresh token handling,
//! role management and a request guard that resolves the caller of an
//! HTTP request against pluggable user and role stores.

pub mod auth;
pub mod config;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod security_logger;
pub mod storage;

// Re-export main components
pub use auth::{AuthGuard, PasswordManager, Principal, RoleEngine, RoleRequirement, TokenManager};
pub use config::*;
pub use error::{Result, RustyGateError};
pub use handlers::AuthService;
pub use storage::{MemoryStore, RoleStore, UserStore};
