use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::clock::{Clock, SystemClock};
use crate::config::{SigningKey, TokenConfig};
use crate::constants::TOKEN_TYPE_BEARER;
use crate::error::{Result, RustyGateError};
use crate::security_logger::fingerprint;

// Claim names owned by the token manager; callers cannot override them
const RESERVED_CLAIMS: &[&str] = &["sub", "type", "iat", "exp"];

/// Token kind discriminator carried in the `type` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied claims, stamped with kind and timestamps at issuance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenClaims {
    pub sub: String,
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            extra: Map::new(),
        }
    }

    /// Adds a custom claim; reserved names are dropped at issuance
    pub fn with_claim(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Access or refresh
    #[serde(rename = "type")]
    pub kind: TokenKind,
    /// Issued at (as UTC timestamp)
    pub iat: i64,
    /// Expiration time (as UTC timestamp)
    pub exp: i64,
    /// Any other claims the issuer attached
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Claims {
    /// Expiry is exclusive of the expiry second itself: a token is still valid at `exp`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() > self.exp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.iat, 0).single()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Response handed to the client after a successful login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

/// Body of a refresh request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response to a refresh request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// Manages JWT token operations
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    validation: Validation,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Creates a token manager backed by the wall clock
    pub fn new(config: &TokenConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a token manager reading time from `clock`
    pub fn with_clock(config: &TokenConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let (encoding_key, decoding_key) = build_keys(&config.key, config.algorithm)?;

        // Expiry is checked against our own clock with zero leeway
        let mut validation = Validation::new(config.algorithm);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = ["exp", "sub"].iter().map(|c| c.to_string()).collect();

        Ok(Self {
            encoding_key,
            decoding_key,
            algorithm: config.algorithm,
            validation,
            access_lifetime: config.access_token_lifetime,
            refresh_lifetime: config.refresh_token_lifetime,
            clock,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn access_lifetime(&self) -> Duration {
        self.access_lifetime
    }

    pub fn refresh_lifetime(&self) -> Duration {
        self.refresh_lifetime
    }

    /// Issues a short-lived access token
    pub fn create_access_token(&self, claims: &TokenClaims) -> Result<String> {
        self.issue(claims, TokenKind::Access, self.access_lifetime)
    }

    /// Issues a long-lived refresh token
    pub fn create_refresh_token(&self, claims: &TokenClaims) -> Result<String> {
        self.issue(claims, TokenKind::Refresh, self.refresh_lifetime)
    }

    /// Issues an access/refresh pair for the same claims
    pub fn issue_pair(&self, claims: &TokenClaims) -> Result<TokenResponse> {
        Ok(TokenResponse {
            access_token: self.create_access_token(claims)?,
            refresh_token: self.create_refresh_token(claims)?,
            token_type: TOKEN_TYPE_BEARER.to_string(),
        })
    }

    fn issue(&self, claims: &TokenClaims, kind: TokenKind, lifetime: Duration) -> Result<String> {
        if claims.sub.is_empty() {
            return Err(RustyGateError::ValidationError(
                "Token subject must not be empty".to_string(),
            ));
        }

        let now = self.clock.now();
        let expires = now.checked_add_signed(lifetime).ok_or_else(|| {
            RustyGateError::TokenError("Token expiry is out of range".to_string())
        })?;
        let mut extra = claims.extra.clone();
        extra.retain(|key, _| !RESERVED_CLAIMS.contains(&key.as_str()));

        let payload = Claims {
            sub: claims.sub.clone(),
            kind,
            iat: now.timestamp(),
            exp: expires.timestamp(),
            extra,
        };

        encode(&Header::new(self.algorithm), &payload, &self.encoding_key)
            .map_err(|e| RustyGateError::TokenError(format!("Failed to generate token: {}", e)))
    }

    /// Decodes a token, checking signature, then expiry, then kind
    pub fn verify_token(&self, token: &str, expected: TokenKind) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                log::debug!("Token {} rejected: {}", fingerprint(token), e);
                match e.kind() {
                    ErrorKind::ExpiredSignature => RustyGateError::Expired,
                    _ => RustyGateError::InvalidSignature,
                }
            })?;

        if claims.is_expired_at(self.clock.now()) {
            log::debug!("Token {} expired at {}", fingerprint(token), claims.exp);
            return Err(RustyGateError::Expired);
        }

        if claims.kind != expected {
            log::debug!(
                "Token {} has type {}, expected {}",
                fingerprint(token),
                claims.kind,
                expected
            );
            return Err(RustyGateError::WrongTokenKind {
                expected,
                found: claims.kind,
            });
        }

        Ok(claims)
    }

    /// Mints a new access token from a valid refresh token.
    ///
    /// The refresh token itself stays valid until it expires; there is no
    /// revocation list.
    pub fn refresh(&self, refresh_token: &str) -> Result<String> {
        let claims = self.verify_token(refresh_token, TokenKind::Refresh)?;
        self.create_access_token(&TokenClaims::new(claims.sub))
    }
}

fn build_keys(key: &SigningKey, algorithm: Algorithm) -> Result<(EncodingKey, DecodingKey)> {
    let config_error =
        |e: jsonwebtoken::errors::Error| RustyGateError::ConfigError(format!("Invalid signing key: {}", e));

    match key {
        SigningKey::Secret(secret) => Ok((
            EncodingKey::from_secret(secret.as_bytes()),
            DecodingKey::from_secret(secret.as_bytes()),
        )),
        SigningKey::KeyPair {
            private_pem,
            public_pem,
        } => match algorithm {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Ok((
                EncodingKey::from_rsa_pem(private_pem.as_bytes()).map_err(config_error)?,
                DecodingKey::from_rsa_pem(public_pem.as_bytes()).map_err(config_error)?,
            )),
            Algorithm::ES256 | Algorithm::ES384 => Ok((
                EncodingKey::from_ec_pem(private_pem.as_bytes()).map_err(config_error)?,
                DecodingKey::from_ec_pem(public_pem.as_bytes()).map_err(config_error)?,
            )),
            other => Err(RustyGateError::ConfigError(format!(
                "{:?} cannot be used with a key pair",
                other
            ))),
        },
    }
}

/// Extracts bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<String> {
    let (scheme, token) = auth_header.trim().split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::clock::ManualClock;

    const SIGNING_KEY: &str = "unit-tests-hmac-key-0123456789-abcdef";

    fn manager() -> (TokenManager, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let manager = TokenManager::with_clock(&TokenConfig::hmac(SIGNING_KEY), clock.clone()).unwrap();
        (manager, clock)
    }

    #[test]
    fn test_access_token_carries_kind_and_lifetime() {
        let (manager, clock) = manager();
        let token = manager.create_access_token(&TokenClaims::new("user-1")).unwrap();
        let claims = manager.verify_token(&token, TokenKind::Access).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.iat, clock.now().timestamp());
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_reserved_claims_cannot_be_overridden() {
        let (manager, _) = manager();
        let claims = TokenClaims::new("user-1")
            .with_claim("type", "refresh")
            .with_claim("exp", 0)
            .with_claim("scope", "read");
        let token = manager.create_access_token(&claims).unwrap();

        let decoded = manager.verify_token(&token, TokenKind::Access).unwrap();
        assert_eq!(decoded.get("scope"), Some(&Value::from("read")));
        assert!(decoded.get("exp").is_none());
        assert!(decoded.exp > 0);
    }

    #[test]
    fn test_empty_subject_rejected() {
        let (manager, _) = manager();
        let result = manager.create_access_token(&TokenClaims::new(""));
        assert!(matches!(result, Err(RustyGateError::ValidationError(_))));
    }

    #[test]
    fn test_expiry_past_representable_range_is_an_error() {
        let (manager, clock) = manager();
        clock.set(DateTime::<Utc>::MAX_UTC - Duration::days(1));

        let result = manager.create_refresh_token(&TokenClaims::new("user-1"));
        assert!(matches!(result, Err(RustyGateError::TokenError(_))));
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi".to_string()));
        assert_eq!(extract_bearer_token("bearer  abc"), Some("abc".to_string()));
        assert_eq!(extract_bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("abc"), None);
    }

    #[test]
    fn test_token_kind_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&TokenKind::Refresh).unwrap(), "\"refresh\"");
    }
}
