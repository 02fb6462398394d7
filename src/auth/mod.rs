//! Authentication and authorization module

pub mod clock;
pub mod guard;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;

// Re-export main components
pub use clock::{Clock, ManualClock, SystemClock};
pub use guard::{authorize_token, guard, AuthGuard};
pub use password::PasswordManager;
pub use principal::Principal;
pub use roles::{has_all, has_any, is_admin, Privilege, RoleEngine, RoleRequirement, RoleSet};
pub use token::{
    AccessTokenResponse, Claims, RefreshRequest, TokenClaims, TokenKind, TokenManager, TokenResponse,
};
pub use user::{Role, RoleId, User, UserId, UserRole};
