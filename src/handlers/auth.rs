//! Bearer credential extraction from request headers

use http::HeaderMap;

use crate::auth::token::extract_bearer_token;
use crate::config::{CredentialConfig, CredentialTransport};
use crate::constants::{AUTHORIZATION_HEADER, COOKIE_HEADER, MAX_TOKEN_LENGTH};

/// Extract token from the Authorization header (`Bearer <token>`)
pub fn extract_token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(AUTHORIZATION_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(extract_bearer_token)
}

/// Extract token from the named cookie.
/// The cookie may hold the bare token or `Bearer <token>`, optionally quoted.
pub fn extract_token_from_cookie(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(COOKIE_HEADER)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == cookie_name)
        .and_then(|(_, value)| cookie_token(value))
}

fn cookie_token(value: &str) -> Option<String> {
    let value = value.trim().trim_matches('"');
    let value = value.replace("%20", " ");

    let token = match extract_bearer_token(&value) {
        Some(token) => token,
        None => value.trim().to_string(),
    };

    if token.is_empty() || token.contains(' ') {
        None
    } else {
        Some(token)
    }
}

/// Locates the bearer credential according to the configured transport
#[derive(Debug, Clone)]
pub struct CredentialExtractor {
    config: CredentialConfig,
}

impl CredentialExtractor {
    pub fn new(config: CredentialConfig) -> Self {
        Self { config }
    }

    pub fn transport(&self) -> CredentialTransport {
        self.config.transport
    }

    /// Returns the first credential found, in transport order
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        let from_header = || {
            let token = extract_token_from_header(headers);
            if token.is_some() {
                log::debug!("Token extracted from Authorization header");
            }
            token
        };
        let from_cookie = || {
            let token = extract_token_from_cookie(headers, &self.config.cookie_name);
            if token.is_some() {
                log::debug!("Token extracted from '{}' cookie", self.config.cookie_name);
            }
            token
        };

        let token = match self.config.transport {
            CredentialTransport::HeaderOnly => from_header(),
            CredentialTransport::CookieOnly => from_cookie(),
            CredentialTransport::HeaderThenCookie => from_header().or_else(from_cookie),
            CredentialTransport::CookieThenHeader => from_cookie().or_else(from_header),
        };

        match token {
            Some(token) if token.len() > MAX_TOKEN_LENGTH => {
                log::warn!("Rejecting credential longer than {} bytes", MAX_TOKEN_LENGTH);
                None
            }
            Some(token) if token.chars().any(|c| c.is_control()) => {
                log::warn!("Rejecting credential containing control characters");
                None
            }
            Some(token) => Some(token),
            None => {
                log::debug!("No credential found in request");
                None
            }
        }
    }
}
