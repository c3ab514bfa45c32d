//! Credential primitives: password hashing, one-time numeric codes and
//! their keyed digests.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_CODE_LENGTH: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    #[error("malformed password hash")]
    MalformedHash,
}

/// Argon2id hash with a fresh random salt, PHC string format.
pub fn hash_password(plaintext: &str) -> Result<String, SecurityError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| SecurityError::CryptoFailure(e.to_string()))?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash cannot be parsed
/// or the primitive itself fails.
pub fn verify_password(plaintext: &str, hash: &str) -> Result<bool, SecurityError> {
    let parsed = PasswordHash::new(hash).map_err(|_| SecurityError::MalformedHash)?;
    match Argon2::default().verify_password(plaintext.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(SecurityError::CryptoFailure(e.to_string())),
    }
}

/// Fixed-length decimal code drawn from the OS CSPRNG. Leading zeros are kept.
pub fn generate_numeric_code(length: usize) -> String {
    let mut rng = rand::rngs::OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// HMAC-SHA256 over reset codes, keyed by the server's code secret
#[derive(Clone)]
pub struct CodeHasher {
    key: Vec<u8>,
}

impl CodeHasher {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self) -> Result<HmacSha256, SecurityError> {
        HmacSha256::new_from_slice(&self.key).map_err(|e| SecurityError::CryptoFailure(e.to_string()))
    }

    /// Hex-encoded digest of the code.
    pub fn hash_code(&self, code: &str) -> Result<String, SecurityError> {
        let mut mac = self.mac()?;
        mac.update(code.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison against a stored hex digest.
    pub fn verify_code(&self, code: &str, digest: &str) -> bool {
        let Ok(expected) = hex::decode(digest) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };
        mac.update(code.as_bytes());
        mac.verify_slice(&expected).is_ok()
    }
}
