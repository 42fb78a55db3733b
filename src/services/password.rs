use bcrypt::{hash, verify, BcryptError};

use crate::config::DEFAULT_BCRYPT_COST;

/// Salted bcrypt hashing with a fixed cost factor.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, BcryptError> {
        hash(plaintext, self.cost)
    }

    /// A malformed digest is a mismatch, never an error.
    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        verify(plaintext, digest).unwrap_or(false)
    }
}
