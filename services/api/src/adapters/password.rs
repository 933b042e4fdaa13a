//! services/api/src/adapters/password.rs
//!
//! Argon2id implementation of the `PasswordHasher` port. Hashes are stored as
//! PHC strings, so verification reads its parameters from the hash itself.

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher as _,
        PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use storefront_core::ports::{PasswordHasher, PortError, PortResult};

#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Argon2id with the crate's recommended cost parameters.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Argon2id with explicit costs; tests use the cheapest accepted values.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> PortResult<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PortError::Unexpected(format!("invalid Argon2 parameters: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> PortResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PortError::Unexpected(format!("failed to hash password: {}", e)))
    }

    fn verify(&self, password: &str, password_hash: &str) -> PortResult<bool> {
        let parsed = PasswordHash::new(password_hash)
            .map_err(|e| PortError::Unexpected(format!("unreadable password hash: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(PortError::Unexpected(format!(
                "failed to verify password: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> Argon2Hasher {
        Argon2Hasher::with_params(Params::MIN_M_COST, 1, 1).unwrap()
    }

    #[test]
    fn hash_verifies_only_the_hashed_password() {
        let hasher = cheap();
        let hash = hasher.hash("correct horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("battery staple", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_a_fresh_salt() {
        let hasher = cheap();

        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error_not_a_mismatch() {
        assert!(cheap().verify("pw", "not-a-phc-string").is_err());
    }
}
