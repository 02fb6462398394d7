//! Account flows: registration, login, refresh, password change, disabling

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::password::PasswordManager;
use crate::auth::token::{
    AccessTokenResponse, RefreshRequest, TokenClaims, TokenKind, TokenManager, TokenResponse,
};
use crate::auth::user::{User, UserId};
use crate::constants::{MAX_USERNAME_LENGTH, TOKEN_TYPE_BEARER};
use crate::error::{Result, RustyGateError};
use crate::security_logger::{log_security_event, SecurityEvent};
use crate::storage::UserStore;

/// Plaintext hashed once at startup so unknown usernames cost a full verify
const TIMING_DUMMY_PASSWORD: &str = "rusty-gate-timing-dummy";

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Public view of a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRead {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub disabled: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserRead {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            disabled: user.disabled,
            created_at: user.created_at,
        }
    }
}

impl From<User> for UserRead {
    fn from(user: User) -> Self {
        UserRead::from(&user)
    }
}

fn validate_registration(request: &RegisterRequest) -> Result<()> {
    let username = request.username.trim();
    if username.is_empty() {
        return Err(RustyGateError::ValidationError("Username must not be empty".to_string()));
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(RustyGateError::ValidationError(format!(
            "Username must be at most {} characters",
            MAX_USERNAME_LENGTH
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(RustyGateError::ValidationError(
            "Username must not contain whitespace".to_string(),
        ));
    }

    match request.email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => {
            return Err(RustyGateError::ValidationError(
                "Email address is not valid".to_string(),
            ))
        }
    }

    validate_password(&request.password)
}

fn validate_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(RustyGateError::ValidationError("Password must not be empty".to_string()));
    }
    Ok(())
}

/// Account operations over a user store
#[derive(Clone)]
pub struct AuthService {
    passwords: PasswordManager,
    tokens: Arc<TokenManager>,
    users: Arc<dyn UserStore>,
    dummy_digest: String,
}

impl AuthService {
    pub fn new(passwords: PasswordManager, tokens: Arc<TokenManager>, users: Arc<dyn UserStore>) -> Result<Self> {
        let dummy_digest = passwords.hash(TIMING_DUMMY_PASSWORD)?;
        Ok(Self {
            passwords,
            tokens,
            users,
            dummy_digest,
        })
    }

    pub fn tokens(&self) -> &Arc<TokenManager> {
        &self.tokens
    }

    /// Creates an enabled account with no roles
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        validate_registration(&request)?;

        let digest = self.passwords.hash_blocking(request.password).await?;
        let user = User::new(
            request.username.trim().to_string(),
            request.email.trim().to_string(),
            digest,
        );

        let user = self.users.create(user).await?;
        log_security_event(&SecurityEvent::UserRegistered {
            user_id: user.id,
            username: user.username.clone(),
        });
        Ok(user)
    }

    /// Checks a username/password pair.
    ///
    /// The password is verified before the disabled flag is looked at, so
    /// `AccountDisabled` is only reported to someone who knows the password.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let username = username.trim();
        let found = self.users.get_by_username(username).await?;

        let digest = match &found {
            Some(user) => user.password_hash.clone(),
            None => self.dummy_digest.clone(),
        };
        let verified = self
            .passwords
            .verify_blocking(password.to_string(), digest)
            .await?;

        let user = match found {
            Some(user) if verified => user,
            Some(_) => {
                log_security_event(&SecurityEvent::LoginFailed {
                    username: username.to_string(),
                    reason: "wrong password".to_string(),
                });
                return Err(RustyGateError::InvalidCredentials);
            }
            None => {
                log_security_event(&SecurityEvent::LoginFailed {
                    username: username.to_string(),
                    reason: "unknown user".to_string(),
                });
                return Err(RustyGateError::InvalidCredentials);
            }
        };

        if !user.is_active() {
            log_security_event(&SecurityEvent::LoginFailed {
                username: username.to_string(),
                reason: "account disabled".to_string(),
            });
            return Err(RustyGateError::AccountDisabled);
        }

        Ok(self.upgrade_digest(user, password).await)
    }

    // Re-hashes digests produced under older cost settings. Failures only cost
    // the upgrade, never the login. Only the digest is written, and only if
    // it is still the one just verified.
    async fn upgrade_digest(&self, mut user: User, password: &str) -> User {
        if !self.passwords.needs_rehash(&user.password_hash) {
            return user;
        }

        match self.passwords.hash_blocking(password.to_string()).await {
            Ok(digest) => {
                match self
                    .users
                    .replace_password_hash(user.id, &user.password_hash, digest.clone())
                    .await
                {
                    Ok(true) => {
                        log::info!("Upgraded password digest for user {}", user.id);
                        user.password_hash = digest;
                        user
                    }
                    Ok(false) => {
                        log::debug!("Digest for user {} changed during upgrade, keeping it", user.id);
                        user
                    }
                    Err(e) => {
                        log::warn!("Could not store upgraded digest for user {}: {}", user.id, e);
                        user
                    }
                }
            }
            Err(e) => {
                log::warn!("Could not re-hash password for user {}: {}", user.id, e);
                user
            }
        }
    }

    /// Issues an access/refresh pair. The token subject is the user id.
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenResponse> {
        let user = self.authenticate(&request.username, &request.password).await?;

        let claims = TokenClaims::new(user.id.to_string()).with_claim("username", user.username.clone());
        let pair = self.tokens.issue_pair(&claims)?;

        log_security_event(&SecurityEvent::LoginSucceeded { user_id: user.id });
        Ok(pair)
    }

    /// Trades a refresh token for a new access token.
    ///
    /// Only the token is checked; the account's current state is picked up by
    /// the guard when the new access token is used.
    pub async fn refresh(&self, request: &RefreshRequest) -> Result<AccessTokenResponse> {
        let claims = self
            .tokens
            .verify_token(&request.refresh_token, TokenKind::Refresh)
            .map_err(|e| {
                log::warn!("Refresh rejected: {}", e);
                RustyGateError::Unauthenticated
            })?;

        let access_token = self.tokens.create_access_token(&TokenClaims::new(claims.sub.clone()))?;
        log_security_event(&SecurityEvent::TokenRefreshed { user_id: claims.sub });

        Ok(AccessTokenResponse {
            access_token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
        })
    }

    pub async fn get_user(&self, user_id: UserId) -> Result<User> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| RustyGateError::UserNotFound(user_id.to_string()))
    }

    /// Replaces the password after checking the current one
    pub async fn change_password(&self, user_id: UserId, request: ChangePasswordRequest) -> Result<()> {
        validate_password(&request.new_password)?;

        let user = self.get_user(user_id).await?;
        let verified = self
            .passwords
            .verify_blocking(request.current_password, user.password_hash.clone())
            .await?;
        if !verified {
            log_security_event(&SecurityEvent::LoginFailed {
                username: user.username.clone(),
                reason: "wrong password on password change".to_string(),
            });
            return Err(RustyGateError::InvalidCredentials);
        }

        let digest = self.passwords.hash_blocking(request.new_password).await?;
        if !self
            .users
            .replace_password_hash(user_id, &user.password_hash, digest)
            .await?
        {
            // Changed by someone else since it was verified
            return Err(RustyGateError::InvalidCredentials);
        }

        log_security_event(&SecurityEvent::PasswordChanged { user_id });
        Ok(())
    }

    /// Enables or disables an account. Outstanding tokens stay valid but the
    /// guard rejects a disabled user on their next request.
    pub async fn set_disabled(&self, user_id: UserId, disabled: bool) -> Result<User> {
        let previous = self.users.set_disabled(user_id, disabled).await?;

        if previous != disabled {
            if disabled {
                log_security_event(&SecurityEvent::AccountDisabled { user_id });
            } else {
                log_security_event(&SecurityEvent::AccountEnabled { user_id });
            }
        }
        self.get_user(user_id).await
    }
}
