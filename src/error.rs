use std::error::Error;
use std::fmt;

use crate::auth::token::TokenKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RustyGateError {
    // Credential errors
    InvalidCredentials,
    AccountDisabled,

    // Token errors
    InvalidSignature,
    Expired,
    WrongTokenKind { expected: TokenKind, found: TokenKind },
    TokenError(String),

    // Access errors
    Unauthenticated,
    Forbidden,

    // Conflicts
    DuplicateRole(String),
    DuplicateUsername(String),
    DuplicateEmail(String),

    // Lookups
    RoleNotFound(String),
    UserNotFound(String),

    // Validation errors
    ValidationError(String),

    // Storage errors
    StorageError(String),

    // Hashing errors
    HashingError(String),

    // Configuration errors
    ConfigError(String),

    // System errors
    SystemError(String),
}

impl RustyGateError {
    /// HTTP status a transport layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidCredentials
            | Self::InvalidSignature
            | Self::Expired
            | Self::WrongTokenKind { .. }
            | Self::Unauthenticated => 401,
            Self::Forbidden => 403,
            Self::AccountDisabled
            | Self::DuplicateRole(_)
            | Self::DuplicateUsername(_)
            | Self::DuplicateEmail(_)
            | Self::ValidationError(_) => 400,
            Self::RoleNotFound(_) | Self::UserNotFound(_) => 404,
            Self::TokenError(_)
            | Self::StorageError(_)
            | Self::HashingError(_)
            | Self::ConfigError(_)
            | Self::SystemError(_) => 500,
        }
    }

    /// Whether the failure was caused by the caller rather than the system
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}

impl fmt::Display for RustyGateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "Incorrect username or password"),
            Self::AccountDisabled => write!(f, "Account is disabled"),
            Self::InvalidSignature => write!(f, "Token signature is invalid"),
            Self::Expired => write!(f, "Token has expired"),
            Self::WrongTokenKind { expected, found } => {
                write!(f, "Wrong token type: expected {}, got {}", expected, found)
            }
            Self::TokenError(msg) => write!(f, "Token error: {}", msg),
            Self::Unauthenticated => write!(f, "Could not validate credentials"),
            Self::Forbidden => write!(f, "Forbidden: insufficient permissions"),
            Self::DuplicateRole(name) => write!(f, "Role already exists: {}", name),
            Self::DuplicateUsername(name) => write!(f, "Username already registered: {}", name),
            Self::DuplicateEmail(email) => write!(f, "Email already registered: {}", email),
            Self::RoleNotFound(id) => write!(f, "Role not found: {}", id),
            Self::UserNotFound(id) => write!(f, "User not found: {}", id),
            Self::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            Self::StorageError(msg) => write!(f, "Storage error: {}", msg),
            Self::HashingError(msg) => write!(f, "Password hashing error: {}", msg),
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::SystemError(msg) => write!(f, "System error: {}", msg),
        }
    }
}

impl Error for RustyGateError {}

// Blocking hash tasks surface join failures as system errors
impl From<tokio::task::JoinError> for RustyGateError {
    fn from(err: tokio::task::JoinError) -> Self {
        RustyGateError::SystemError(format!("Blocking task failed: {}", err))
    }
}

// Generic result type for RustyGate
pub type Result<T> = std::result::Result<T, RustyGateError>;
