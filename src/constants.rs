// Token lifetimes
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;
pub const TOKEN_TYPE_BEARER: &str = "bearer";
pub const MAX_TOKEN_LIFETIME_DAYS: i64 = 3650;

// Credential transport
pub const AUTHORIZATION_HEADER: &str = "authorization";
pub const COOKIE_HEADER: &str = "cookie";
pub const DEFAULT_ACCESS_COOKIE: &str = "access_token";
pub const MAX_TOKEN_LENGTH: usize = 4096;

// Argon2id cost (OWASP minimum recommendation)
pub const DEFAULT_ARGON2_MEMORY_KIB: u32 = 19_456;
pub const DEFAULT_ARGON2_ITERATIONS: u32 = 2;
pub const DEFAULT_ARGON2_PARALLELISM: u32 = 1;

// Roles carrying admin-level privilege
pub const ADMIN_ROLE: &str = "admin";
pub const SUPERADMIN_ROLE: &str = "superadmin";

/// Roles seeded by `RoleEngine::ensure_roles`
pub const STANDARD_ROLES: &[(&str, &str)] = &[
    (SUPERADMIN_ROLE, "Super administrator with all privileges"),
    (ADMIN_ROLE, "Administrator with management privileges"),
    ("moderator", "User with content moderation privileges"),
    ("premium", "Premium tier user"),
    ("verified", "Verified user"),
    ("user", "Standard user with basic privileges"),
];

// Input limits
pub const MAX_USERNAME_LENGTH: usize = 64;
pub const MAX_ROLE_NAME_LENGTH: usize = 64;
