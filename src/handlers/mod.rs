//! Request-facing entry points: credential extraction and account flows

pub mod account;
pub mod auth;

pub use account::{AuthService, ChangePasswordRequest, LoginRequest, RegisterRequest, UserRead};
pub use auth::CredentialExtractor;
