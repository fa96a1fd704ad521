/// Password Hashing and Verification
///
/// bcrypt with a random per-hash salt embedded in the output string.
/// Strength rules live in `validators`; this module only transforms.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::CryptoError;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns `CryptoError::Hashing` if bcrypt fails (e.g. the salt could not be drawn)
pub fn hash_password(password: &str) -> Result<String, CryptoError> {
    hash(password, DEFAULT_COST).map_err(|e| CryptoError::Hashing(e.to_string()))
}

/// bcrypt reads at most this many bytes of input and ignores the rest
pub const BCRYPT_MAX_INPUT_BYTES: usize = 72;

/// Verify a password against its hash
///
/// A mismatch is `Ok(false)`. Only a hash that cannot be parsed is an error.
/// Input longer than bcrypt can read never matches, otherwise any suffix on a
/// 72-byte password would be accepted.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, CryptoError> {
    if password.len() > BCRYPT_MAX_INPUT_BYTES {
        return Ok(false);
    }
    verify(password, hash).map_err(|e| CryptoError::Verification(e.to_string()))
}
