use std::sync::Arc;

use http::{HeaderMap, HeaderValue};
use log::{error, info, warn};

use rusty_gate::auth::RefreshRequest;
use rusty_gate::config::{AuthConfig, CredentialConfig, CredentialTransport};
use rusty_gate::constants::{ADMIN_ROLE, STANDARD_ROLES};
use rusty_gate::handlers::{CredentialExtractor, LoginRequest, RegisterRequest, UserRead};
use rusty_gate::{
    AuthGuard, AuthService, MemoryStore, PasswordManager, RoleEngine, RoleStore, RustyGateError,
    TokenManager, UserStore,
};

#[tokio::main]
async fn main() {
    // Initialize env
    match dotenvy::dotenv() {
        Ok(_) => info!("Environment variables loaded from .env file"),
        Err(e) => warn!("Failed to load .env file: {}", e),
    };

    // Initialize logging
    env_logger::init();

    let config = match AuthConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Configuration: algorithm={:?}, access={}m, refresh={}d, transport={:?}",
        config.token.algorithm,
        config.token.access_token_lifetime.num_minutes(),
        config.token.refresh_token_lifetime.num_days(),
        config.credentials.transport
    );

    if let Err(e) = run(config).await {
        error!("Demo failed: {}", e);
        std::process::exit(1);
    }
}

/// Builds request headers carrying `token` the way the configured transport expects
fn request_headers(credentials: &CredentialConfig, token: &str) -> rusty_gate::Result<HeaderMap> {
    let invalid = |e: http::header::InvalidHeaderValue| RustyGateError::SystemError(e.to_string());

    let mut headers = HeaderMap::new();
    match credentials.transport {
        CredentialTransport::CookieOnly | CredentialTransport::CookieThenHeader => {
            let cookie = format!("{}=Bearer%20{}", credentials.cookie_name, token);
            headers.insert(http::header::COOKIE, HeaderValue::from_str(&cookie).map_err(invalid)?);
        }
        CredentialTransport::HeaderOnly | CredentialTransport::HeaderThenCookie => {
            let bearer = format!("Bearer {}", token);
            headers.insert(
                http::header::AUTHORIZATION,
                HeaderValue::from_str(&bearer).map_err(invalid)?,
            );
        }
    }
    Ok(headers)
}

async fn run(config: AuthConfig) -> rusty_gate::Result<()> {
    let store = MemoryStore::new();
    let users: Arc<dyn UserStore> = Arc::new(store.clone());
    let role_store: Arc<dyn RoleStore> = Arc::new(store.clone());

    let tokens = Arc::new(TokenManager::new(&config.token)?);
    let passwords = PasswordManager::new(&config.password)?;
    let roles = RoleEngine::new(role_store, users.clone());

    let seeded = roles.ensure_roles(STANDARD_ROLES).await?;
    info!("Seeded {} standard roles", seeded.len());

    let service = AuthService::new(passwords, tokens.clone(), users.clone())?;
    let guard = AuthGuard::new(
        CredentialExtractor::new(config.credentials.clone()),
        tokens,
        users,
        roles.clone(),
    );

    let alice = service
        .register(RegisterRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "pw123".to_string(),
        })
        .await?;
    let profile = serde_json::to_string(&UserRead::from(&alice))
        .map_err(|e| RustyGateError::SystemError(e.to_string()))?;
    info!("Registered {}", profile);

    let pair = service
        .login(&LoginRequest {
            username: "alice".to_string(),
            password: "pw123".to_string(),
        })
        .await?;
    info!("Logged in, token type '{}'", pair.token_type);

    let headers = request_headers(&config.credentials, &pair.access_token)?;
    let principal = guard.authenticate(&headers).await?;
    info!("Authenticated as {} with roles {:?}", principal.username(), principal.roles);

    match guard.require_admin(&headers).await {
        Err(e) => info!("Admin request before grant rejected: {} (status {})", e, e.status_code()),
        Ok(_) => warn!("Admin request unexpectedly allowed before grant"),
    }

    let admin = roles
        .get_role(ADMIN_ROLE)
        .await?
        .ok_or_else(|| RustyGateError::RoleNotFound(ADMIN_ROLE.to_string()))?;
    roles.assign_role_to_user(alice.id, admin.id).await?;

    let principal = guard.require_admin(&headers).await?;
    info!("Admin request allowed for {} with roles {:?}", principal.username(), principal.roles);

    let refreshed = service
        .refresh(&RefreshRequest {
            refresh_token: pair.refresh_token,
        })
        .await?;
    let headers = request_headers(&config.credentials, &refreshed.access_token)?;
    let principal = guard.authenticate(&headers).await?;
    info!("Refreshed access token accepted for {}", principal.username());

    service.set_disabled(alice.id, true).await?;
    match guard.authenticate(&headers).await {
        Err(e) => info!("Disabled account rejected: {} (status {})", e, e.status_code()),
        Ok(_) => warn!("Disabled account unexpectedly allowed"),
    }

    Ok(())
}
