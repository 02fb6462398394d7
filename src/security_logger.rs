//! Security-focused logging module to track security events
//!
//! Events go to the `security` log target so deployments can route them
//! separately. Raw tokens and passwords never reach the log; tokens are
//! identified by a short SHA-256 fingerprint.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::auth::user::{RoleId, UserId};

pub const SECURITY_TARGET: &str = "security";

/// Types of security events to track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    LoginFailed { username: String, reason: String },
    LoginSucceeded { user_id: UserId },
    TokenValidationFailed { token_id: String, reason: String },
    TokenRefreshed { user_id: String },

    // Authorization events
    PermissionDenied { user_id: UserId, requirement: String },
    DisabledAccountAccess { user_id: UserId },

    // Account and role administration
    UserRegistered { user_id: UserId, username: String },
    PasswordChanged { user_id: UserId },
    AccountDisabled { user_id: UserId },
    AccountEnabled { user_id: UserId },
    RoleAssigned { user_id: UserId, role: String },
    RoleRevoked { user_id: UserId, role_id: RoleId },
}

impl SecurityEvent {
    /// Stable key for filtering and counting
    pub fn key(&self) -> &'static str {
        match self {
            SecurityEvent::LoginFailed { .. } => "login_failed",
            SecurityEvent::LoginSucceeded { .. } => "login_succeeded",
            SecurityEvent::TokenValidationFailed { .. } => "token_validation_failed",
            SecurityEvent::TokenRefreshed { .. } => "token_refreshed",
            SecurityEvent::PermissionDenied { .. } => "permission_denied",
            SecurityEvent::DisabledAccountAccess { .. } => "disabled_account_access",
            SecurityEvent::UserRegistered { .. } => "user_registered",
            SecurityEvent::PasswordChanged { .. } => "password_changed",
            SecurityEvent::AccountDisabled { .. } => "account_disabled",
            SecurityEvent::AccountEnabled { .. } => "account_enabled",
            SecurityEvent::RoleAssigned { .. } => "role_assigned",
            SecurityEvent::RoleRevoked { .. } => "role_revoked",
        }
    }
}

/// Log a security event
pub fn log_security_event(event: &SecurityEvent) {
    match event {
        SecurityEvent::LoginFailed { username, reason } => {
            log::warn!(target: SECURITY_TARGET, "SECURITY: Login failed - User: {}, Reason: {}", username, reason);
        }
        SecurityEvent::LoginSucceeded { user_id } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: Login success - User: {}", user_id);
        }
        SecurityEvent::TokenValidationFailed { token_id, reason } => {
            log::warn!(target: SECURITY_TARGET, "SECURITY: Token validation failed - Token: {}, Reason: {}", token_id, reason);
        }
        SecurityEvent::TokenRefreshed { user_id } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: Access token refreshed - User: {}", user_id);
        }
        SecurityEvent::PermissionDenied { user_id, requirement } => {
            log::warn!(target: SECURITY_TARGET, "SECURITY: Permission denied - User: {}, Requires: {}", user_id, requirement);
        }
        SecurityEvent::DisabledAccountAccess { user_id } => {
            log::warn!(target: SECURITY_TARGET, "SECURITY: Disabled account attempted access - User: {}", user_id);
        }
        SecurityEvent::UserRegistered { user_id, username } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: User registered - User: {} ({})", username, user_id);
        }
        SecurityEvent::PasswordChanged { user_id } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: Password changed - User: {}", user_id);
        }
        SecurityEvent::AccountDisabled { user_id } => {
            log::warn!(target: SECURITY_TARGET, "SECURITY: Account disabled - User: {}", user_id);
        }
        SecurityEvent::AccountEnabled { user_id } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: Account enabled - User: {}", user_id);
        }
        SecurityEvent::RoleAssigned { user_id, role } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: Role assigned - User: {}, Role: {}", user_id, role);
        }
        SecurityEvent::RoleRevoked { user_id, role_id } => {
            log::info!(target: SECURITY_TARGET, "SECURITY: Role revoked - User: {}, Role: {}", user_id, role_id);
        }
    }
}

/// Short, non-reversible identifier for a token, safe to log
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    URL_SAFE_NO_PAD.encode(&digest[..9])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable_and_short() {
        let a = fingerprint("header.payload.signature");
        assert_eq!(a, fingerprint("header.payload.signature"));
        assert_ne!(a, fingerprint("header.payload.signaturf"));
        assert_eq!(a.len(), 12);
        assert!(!a.contains("payload"));
    }

    #[test]
    fn test_event_keys() {
        let event = SecurityEvent::LoginFailed {
            username: "alice".into(),
            reason: "bad password".into(),
        };
        assert_eq!(event.key(), "login_failed");
        log_security_event(&event);
    }
}
