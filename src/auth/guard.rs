//! Request guard: credential -> verified token -> active user -> role check
//!
//! Every request is resolved from scratch. Nothing about the user or their
//! roles is cached between calls, so disabling an account or revoking a role
//! takes effect on the next request, while the token itself stays valid.

use std::sync::Arc;

use http::HeaderMap;
use uuid::Uuid;

use crate::auth::principal::Principal;
use crate::auth::roles::{RoleEngine, RoleRequirement};
use crate::auth::token::{TokenKind, TokenManager};
use crate::error::{Result, RustyGateError};
use crate::handlers::auth::CredentialExtractor;
use crate::security_logger::{fingerprint, log_security_event, SecurityEvent};
use crate::storage::UserStore;

/// Resolves the caller of one request and checks `requirement` against them.
///
/// Missing or invalid credentials give `Unauthenticated`, a disabled account
/// gives `AccountDisabled` and a failed role check gives `Forbidden`.
pub async fn guard(
    extractor: &CredentialExtractor,
    tokens: &TokenManager,
    users: &dyn UserStore,
    roles: &RoleEngine,
    requirement: &RoleRequirement,
    headers: &HeaderMap,
) -> Result<Principal> {
    let token = extractor
        .extract(headers)
        .ok_or(RustyGateError::Unauthenticated)?;
    authorize_token(tokens, users, roles, requirement, &token).await
}

/// Same as [`guard`] for a credential already taken off the request
pub async fn authorize_token(
    tokens: &TokenManager,
    users: &dyn UserStore,
    roles: &RoleEngine,
    requirement: &RoleRequirement,
    token: &str,
) -> Result<Principal> {
    let claims = tokens.verify_token(token, TokenKind::Access).map_err(|e| {
        log_security_event(&SecurityEvent::TokenValidationFailed {
            token_id: fingerprint(token),
            reason: e.to_string(),
        });
        RustyGateError::Unauthenticated
    })?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
        log::warn!("Token {} carries a malformed subject", fingerprint(token));
        RustyGateError::Unauthenticated
    })?;

    // Storage failures propagate as-is, they are not the caller's fault
    let user = match users.get_by_id(user_id).await? {
        Some(user) => user,
        None => {
            log::warn!("Token {} names unknown user {}", fingerprint(token), user_id);
            return Err(RustyGateError::Unauthenticated);
        }
    };

    if !user.is_active() {
        log_security_event(&SecurityEvent::DisabledAccountAccess { user_id });
        return Err(RustyGateError::AccountDisabled);
    }

    let held = roles.get_user_role_names(user_id).await?;
    if !requirement.is_satisfied_by(&held) {
        log_security_event(&SecurityEvent::PermissionDenied {
            user_id,
            requirement: requirement.describe(),
        });
        return Err(RustyGateError::Forbidden);
    }

    log::debug!("Authorized user {} ({})", user.username, requirement.describe());
    Ok(Principal::new(user, held))
}

/// Bundles the guard's collaborators for repeated use
#[derive(Clone)]
pub struct AuthGuard {
    extractor: CredentialExtractor,
    tokens: Arc<TokenManager>,
    users: Arc<dyn UserStore>,
    roles: RoleEngine,
}

impl AuthGuard {
    pub fn new(
        extractor: CredentialExtractor,
        tokens: Arc<TokenManager>,
        users: Arc<dyn UserStore>,
        roles: RoleEngine,
    ) -> Self {
        Self {
            extractor,
            tokens,
            users,
            roles,
        }
    }

    /// Any active, authenticated user
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal> {
        self.authorize(headers, &RoleRequirement::Authenticated).await
    }

    pub async fn authorize(&self, headers: &HeaderMap, requirement: &RoleRequirement) -> Result<Principal> {
        guard(
            &self.extractor,
            &self.tokens,
            self.users.as_ref(),
            &self.roles,
            requirement,
            headers,
        )
        .await
    }

    pub async fn authorize_token(&self, token: &str, requirement: &RoleRequirement) -> Result<Principal> {
        authorize_token(&self.tokens, self.users.as_ref(), &self.roles, requirement, token).await
    }

    pub async fn require_any(&self, headers: &HeaderMap, roles: &[&str]) -> Result<Principal> {
        self.authorize(headers, &RoleRequirement::any(roles.iter().copied()))
            .await
    }

    pub async fn require_all(&self, headers: &HeaderMap, roles: &[&str]) -> Result<Principal> {
        self.authorize(headers, &RoleRequirement::all(roles.iter().copied()))
            .await
    }

    pub async fn require_admin(&self, headers: &HeaderMap) -> Result<Principal> {
        self.authorize(headers, &RoleRequirement::Admin).await
    }
}
