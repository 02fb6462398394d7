//! Argon2id credential hashing
//!
//! Digests are PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`), so
//! the algorithm, cost and salt travel with the hash and verification needs
//! nothing but the digest itself.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

use crate::config::PasswordConfig;
use crate::error::{Result, RustyGateError};

/// Hashes and verifies passwords
#[derive(Debug, Clone)]
pub struct PasswordManager {
    params: Params,
}

impl PasswordManager {
    pub fn new(config: &PasswordConfig) -> Result<Self> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| RustyGateError::ConfigError(format!("Invalid Argon2 parameters: {}", e)))?;
        Ok(Self { params })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes `plaintext` with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.hasher()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| RustyGateError::HashingError(e.to_string()))
    }

    /// Checks `plaintext` against `digest` using the parameters recorded in the digest.
    /// Malformed digests fail verification.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        let parsed = match PasswordHash::new(digest) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::debug!("Rejecting malformed password digest: {}", e);
                return false;
            }
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }

    /// True when `digest` was produced with other parameters than the configured ones
    pub fn needs_rehash(&self, digest: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            return true;
        };

        if parsed.algorithm.as_str() != Algorithm::Argon2id.as_str() {
            return true;
        }

        match Params::try_from(&parsed) {
            Ok(params) => {
                params.m_cost() != self.params.m_cost()
                    || params.t_cost() != self.params.t_cost()
                    || params.p_cost() != self.params.p_cost()
            }
            Err(_) => true,
        }
    }

    /// `hash` on the blocking pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String> {
        let manager = self.clone();
        tokio::task::spawn_blocking(move || manager.hash(&plaintext)).await?
    }

    /// `verify` on the blocking pool
    pub async fn verify_blocking(&self, plaintext: String, digest: String) -> Result<bool> {
        let manager = self.clone();
        Ok(tokio::task::spawn_blocking(move || manager.verify(&plaintext, &digest)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordManager {
        PasswordManager::new(&PasswordConfig::new(256, 1, 1)).unwrap()
    }

    #[test]
    fn test_hash_is_self_describing() {
        let digest = cheap().hash("test_password").unwrap();
        assert!(digest.starts_with("$argon2id$v=19$m=256,t=1,p=1$"));
    }

    #[test]
    fn test_verify_uses_digest_parameters() {
        let strong = PasswordManager::new(&PasswordConfig::new(512, 2, 1)).unwrap();
        let digest = strong.hash("pw123").unwrap();

        // A manager with other parameters still verifies the older digest
        assert!(cheap().verify("pw123", &digest));
        assert!(cheap().needs_rehash(&digest));
        assert!(!strong.needs_rehash(&digest));
    }

    #[test]
    fn test_malformed_digests_fail_quietly() {
        let manager = cheap();
        assert!(!manager.verify("pw", ""));
        assert!(!manager.verify("pw", "not_a_valid_hash"));
        assert!(!manager.verify("pw", "$2b$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW"));
        assert!(manager.needs_rehash("not_a_valid_hash"));
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(PasswordManager::new(&PasswordConfig::new(1, 1, 1)).is_err());
    }

    #[tokio::test]
    async fn test_blocking_variants() {
        let manager = cheap();
        let digest = manager.hash_blocking("secret pw".to_string()).await.unwrap();
        assert!(manager
            .verify_blocking("secret pw".to_string(), digest.clone())
            .await
            .unwrap());
        assert!(!manager
            .verify_blocking("other".to_string(), digest)
            .await
            .unwrap());
    }
}
