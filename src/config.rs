//! Authentication configuration module
//! Fixed at startup and passed explicitly to the managers that need it

use std::env;
use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;

use crate::constants::{
    DEFAULT_ACCESS_COOKIE, DEFAULT_ACCESS_TOKEN_MINUTES, DEFAULT_ARGON2_ITERATIONS,
    DEFAULT_ARGON2_MEMORY_KIB, DEFAULT_ARGON2_PARALLELISM, DEFAULT_REFRESH_TOKEN_DAYS,
    MAX_TOKEN_LIFETIME_DAYS,
};
use crate::error::{Result, RustyGateError};

/// Key material used to sign and verify tokens
#[derive(Clone)]
pub enum SigningKey {
    /// Shared secret for the HMAC family
    Secret(String),
    /// PEM encoded key pair for the RSA and ECDSA families
    KeyPair { private_pem: String, public_pem: String },
}

// Key material must never end up in logs
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Secret(_) => f.write_str("SigningKey::Secret(<redacted>)"),
            Self::KeyPair { .. } => f.write_str("SigningKey::KeyPair(<redacted>)"),
        }
    }
}

/// Token signing and lifetime parameters
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub key: SigningKey,
    pub algorithm: Algorithm,
    pub access_token_lifetime: Duration,
    pub refresh_token_lifetime: Duration,
}

impl TokenConfig {
    /// HS256 configuration with the default lifetimes
    pub fn hmac(secret: impl Into<String>) -> Self {
        Self {
            key: SigningKey::Secret(secret.into()),
            algorithm: Algorithm::HS256,
            access_token_lifetime: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_lifetime: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
        }
    }

    /// Asymmetric configuration from a PEM key pair
    pub fn key_pair(
        algorithm: Algorithm,
        private_pem: impl Into<String>,
        public_pem: impl Into<String>,
    ) -> Self {
        Self {
            key: SigningKey::KeyPair {
                private_pem: private_pem.into(),
                public_pem: public_pem.into(),
            },
            algorithm,
            access_token_lifetime: Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_lifetime: Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Out-of-range values are kept out of range and rejected by `validate`
    pub fn with_access_minutes(mut self, minutes: i64) -> Self {
        self.access_token_lifetime = lifetime(minutes, Duration::try_minutes);
        self
    }

    pub fn with_refresh_days(mut self, days: i64) -> Self {
        self.refresh_token_lifetime = lifetime(days, Duration::try_days);
        self
    }

    /// Structural checks: key family matches the algorithm, lifetimes are ordered
    pub fn validate(&self) -> Result<()> {
        match (&self.key, is_hmac(self.algorithm)) {
            (SigningKey::Secret(secret), true) => {
                if secret.is_empty() {
                    return Err(RustyGateError::ConfigError(
                        "Signing secret must not be empty".to_string(),
                    ));
                }
            }
            (SigningKey::KeyPair { .. }, false) => {
                if self.algorithm == Algorithm::EdDSA {
                    return Err(RustyGateError::ConfigError(
                        "EdDSA signing is not supported".to_string(),
                    ));
                }
            }
            (SigningKey::Secret(_), false) => {
                return Err(RustyGateError::ConfigError(format!(
                    "{:?} requires a key pair, not a shared secret",
                    self.algorithm
                )));
            }
            (SigningKey::KeyPair { .. }, true) => {
                return Err(RustyGateError::ConfigError(format!(
                    "{:?} requires a shared secret, not a key pair",
                    self.algorithm
                )));
            }
        }

        if self.access_token_lifetime <= Duration::zero() {
            return Err(RustyGateError::ConfigError(
                "Access token lifetime must be positive".to_string(),
            ));
        }

        if self.refresh_token_lifetime > Duration::days(MAX_TOKEN_LIFETIME_DAYS) {
            return Err(RustyGateError::ConfigError(format!(
                "Token lifetimes must not exceed {} days",
                MAX_TOKEN_LIFETIME_DAYS
            )));
        }

        if self.refresh_token_lifetime <= self.access_token_lifetime {
            return Err(RustyGateError::ConfigError(
                "Refresh token lifetime must exceed access token lifetime".to_string(),
            ));
        }

        Ok(())
    }
}

// Saturates instead of panicking on values chrono cannot represent
fn lifetime(value: i64, unit: fn(i64) -> Option<Duration>) -> Duration {
    match unit(value) {
        Some(duration) => duration,
        None if value < 0 => Duration::zero(),
        None => Duration::days(MAX_TOKEN_LIFETIME_DAYS + 1),
    }
}

fn is_hmac(algorithm: Algorithm) -> bool {
    matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl PasswordConfig {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_ARGON2_MEMORY_KIB,
            DEFAULT_ARGON2_ITERATIONS,
            DEFAULT_ARGON2_PARALLELISM,
        )
    }
}

/// Where the guard looks for the bearer credential, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTransport {
    HeaderOnly,
    CookieOnly,
    HeaderThenCookie,
    CookieThenHeader,
}

impl FromStr for CredentialTransport {
    type Err = RustyGateError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().replace(' ', "").as_str() {
            "header" => Ok(Self::HeaderOnly),
            "cookie" => Ok(Self::CookieOnly),
            "either" | "header,cookie" => Ok(Self::HeaderThenCookie),
            "cookie,header" => Ok(Self::CookieThenHeader),
            other => Err(RustyGateError::ConfigError(format!(
                "Unknown credential transport '{}'. Expected header, cookie, either, header,cookie or cookie,header",
                other
            ))),
        }
    }
}

/// Credential extraction settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialConfig {
    pub transport: CredentialTransport,
    pub cookie_name: String,
}

impl CredentialConfig {
    pub fn new(transport: CredentialTransport) -> Self {
        Self {
            transport,
            cookie_name: DEFAULT_ACCESS_COOKIE.to_string(),
        }
    }

    pub fn with_cookie_name(mut self, cookie_name: impl Into<String>) -> Self {
        self.cookie_name = cookie_name.into();
        self
    }
}

/// Complete configuration for the authentication core
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub token: TokenConfig,
    pub password: PasswordConfig,
    pub credentials: CredentialConfig,
}

impl AuthConfig {
    pub fn new(token: TokenConfig) -> Self {
        Self {
            token,
            password: PasswordConfig::default(),
            credentials: CredentialConfig::new(CredentialTransport::HeaderThenCookie),
        }
    }

    pub fn with_password(mut self, password: PasswordConfig) -> Self {
        self.password = password;
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialConfig) -> Self {
        self.credentials = credentials;
        self
    }

    /// Validate that a signing secret meets security requirements
    fn validate_secret(secret: &str) -> Result<()> {
        if secret.len() < 32 {
            return Err(RustyGateError::ConfigError(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // Check for insecure default or example values
        let insecure_patterns = [
            "your-secret-key",
            "change-this",
            "change-in-production",
            "test-secret",
            "default",
            "secret",
            "password",
            "12345",
        ];

        for pattern in &insecure_patterns {
            if secret.to_lowercase().contains(pattern) {
                return Err(RustyGateError::ConfigError(format!(
                    "JWT secret contains insecure pattern '{}'. Please use a secure random secret generated with: openssl rand -base64 32",
                    pattern
                )));
            }
        }

        // Ensure some complexity
        if secret.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RustyGateError::ConfigError(
                "JWT secret should contain mixed characters (letters, numbers, symbols) for security"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let algorithm = match lookup("RUSTY_GATE_JWT_ALGORITHM") {
            Some(name) => Algorithm::from_str(name.trim()).map_err(|_| {
                RustyGateError::ConfigError(format!("Unsupported signing algorithm '{}'", name))
            })?,
            None => Algorithm::HS256,
        };

        let mut token = if is_hmac(algorithm) {
            let secret = lookup("RUSTY_GATE_JWT_SECRET")
                .or_else(|| lookup("JWT_SECRET"))
                .ok_or_else(|| {
                    RustyGateError::ConfigError(
                        "JWT_SECRET environment variable is required for security. \
                         Generate one with: openssl rand -base64 32"
                            .to_string(),
                    )
                })?;
            Self::validate_secret(&secret)?;
            TokenConfig::hmac(secret).with_algorithm(algorithm)
        } else {
            let private_pem = read_key_file(&lookup, "RUSTY_GATE_JWT_PRIVATE_KEY_PATH")?;
            let public_pem = read_key_file(&lookup, "RUSTY_GATE_JWT_PUBLIC_KEY_PATH")?;
            TokenConfig::key_pair(algorithm, private_pem, public_pem)
        };

        let access_minutes = lookup("RUSTY_GATE_ACCESS_TOKEN_MINUTES")
            .and_then(|m| m.parse().ok())
            .unwrap_or(DEFAULT_ACCESS_TOKEN_MINUTES);

        let refresh_days = lookup("RUSTY_GATE_REFRESH_TOKEN_DAYS")
            .and_then(|d| d.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_TOKEN_DAYS);

        token = token
            .with_access_minutes(access_minutes)
            .with_refresh_days(refresh_days);
        token.validate()?;

        let password = PasswordConfig::new(
            lookup("RUSTY_GATE_ARGON2_MEMORY_KIB")
                .and_then(|m| m.parse().ok())
                .unwrap_or(DEFAULT_ARGON2_MEMORY_KIB),
            lookup("RUSTY_GATE_ARGON2_ITERATIONS")
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_ARGON2_ITERATIONS),
            lookup("RUSTY_GATE_ARGON2_PARALLELISM")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_ARGON2_PARALLELISM),
        );

        let transport = match lookup("RUSTY_GATE_CREDENTIAL_TRANSPORT") {
            Some(value) => value.parse()?,
            None => CredentialTransport::HeaderThenCookie,
        };

        let cookie_name = lookup("RUSTY_GATE_ACCESS_COOKIE")
            .unwrap_or_else(|| DEFAULT_ACCESS_COOKIE.to_string());

        Ok(Self {
            token,
            password,
            credentials: CredentialConfig::new(transport).with_cookie_name(cookie_name),
        })
    }
}

fn read_key_file<F>(lookup: &F, var: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let path = lookup(var).ok_or_else(|| {
        RustyGateError::ConfigError(format!(
            "{} is required for asymmetric signing algorithms",
            var
        ))
    })?;

    std::fs::read_to_string(&path).map_err(|e| {
        RustyGateError::ConfigError(format!("Cannot read key file {}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const STRONG: &str = "qX7!vR2#mL9$wP4&zN6*tB1@kH8^dF3%";

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_from_lookup_requires_secret() {
        let result = AuthConfig::from_lookup(lookup_from(&[]));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn test_from_lookup_defaults() {
        let config = AuthConfig::from_lookup(lookup_from(&[("JWT_SECRET", STRONG)])).unwrap();
        assert_eq!(config.token.algorithm, Algorithm::HS256);
        assert_eq!(config.token.access_token_lifetime, Duration::minutes(30));
        assert_eq!(config.token.refresh_token_lifetime, Duration::days(7));
        assert_eq!(config.credentials.transport, CredentialTransport::HeaderThenCookie);
        assert_eq!(config.credentials.cookie_name, "access_token");
        assert_eq!(config.password, PasswordConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AuthConfig::from_lookup(lookup_from(&[
            ("RUSTY_GATE_JWT_SECRET", STRONG),
            ("RUSTY_GATE_JWT_ALGORITHM", "HS512"),
            ("RUSTY_GATE_ACCESS_TOKEN_MINUTES", "15"),
            ("RUSTY_GATE_REFRESH_TOKEN_DAYS", "30"),
            ("RUSTY_GATE_CREDENTIAL_TRANSPORT", "cookie"),
            ("RUSTY_GATE_ACCESS_COOKIE", "session"),
        ]))
        .unwrap();
        assert_eq!(config.token.algorithm, Algorithm::HS512);
        assert_eq!(config.token.access_token_lifetime, Duration::minutes(15));
        assert_eq!(config.token.refresh_token_lifetime, Duration::days(30));
        assert_eq!(config.credentials.transport, CredentialTransport::CookieOnly);
        assert_eq!(config.credentials.cookie_name, "session");
    }

    #[test]
    fn test_insecure_secrets_rejected() {
        for secret in [
            "short",
            "this-is-a-demo-secret-key-change-in-production",
            "abcdefghijklmnopqrstuvwxyzabcdefghij",
        ] {
            let result = AuthConfig::from_lookup(lookup_from(&[("JWT_SECRET", secret)]));
            assert!(result.is_err(), "secret {:?} should be rejected", secret);
        }
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let result = AuthConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", STRONG),
            ("RUSTY_GATE_JWT_ALGORITHM", "HS999"),
        ]));
        assert!(matches!(result, Err(RustyGateError::ConfigError(_))));
    }

    #[test]
    fn test_refresh_must_outlive_access() {
        let config = TokenConfig::hmac(STRONG)
            .with_access_minutes(60 * 24 * 8)
            .with_refresh_days(7);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_lifetimes_rejected() {
        let result = AuthConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", STRONG),
            ("RUSTY_GATE_ACCESS_TOKEN_MINUTES", "9223372036854775807"),
        ]));
        assert!(matches!(result, Err(RustyGateError::ConfigError(_))));

        let result = AuthConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", STRONG),
            ("RUSTY_GATE_ACCESS_TOKEN_MINUTES", "-9223372036854775808"),
        ]));
        assert!(matches!(result, Err(RustyGateError::ConfigError(_))));

        assert!(TokenConfig::hmac(STRONG).with_refresh_days(1_000_000_000).validate().is_err());
        assert!(TokenConfig::hmac(STRONG).with_refresh_days(i64::MAX).validate().is_err());
        assert!(TokenConfig::hmac(STRONG)
            .with_refresh_days(MAX_TOKEN_LIFETIME_DAYS)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_secret_with_asymmetric_algorithm_rejected() {
        let config = TokenConfig::hmac(STRONG).with_algorithm(Algorithm::RS256);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transport_parsing() {
        assert_eq!("header".parse::<CredentialTransport>().unwrap(), CredentialTransport::HeaderOnly);
        assert_eq!("Either".parse::<CredentialTransport>().unwrap(), CredentialTransport::HeaderThenCookie);
        assert_eq!(
            "cookie, header".parse::<CredentialTransport>().unwrap(),
            CredentialTransport::CookieThenHeader
        );
        assert!("query".parse::<CredentialTransport>().is_err());
    }

    #[test]
    fn test_signing_key_debug_is_redacted() {
        let key = SigningKey::Secret(STRONG.to_string());
        assert!(!format!("{:?}", key).contains(STRONG));
    }
}
