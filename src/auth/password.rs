//! Password hashing and verification.
//!
//! Argon2id with a fixed work factor, encoded as PHC strings so the
//! parameters and salt travel with the digest.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

/// Memory cost in KiB (19 MiB)
const M_COST_KIB: u32 = 19_456;
const T_COST: u32 = 2;
const P_COST: u32 = 1;

fn argon2() -> Result<Argon2<'static>, AppError> {
    let params = Params::new(M_COST_KIB, T_COST, P_COST, None)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("invalid argon2 params: {e}")))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC digest.
///
/// Returns `false` for a mismatch and for a digest that cannot be parsed.
pub fn verify_password(password: &str, digest: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(digest) else {
        tracing::warn!("Stored password hash is malformed");
        return false;
    };

    // Verification uses the parameters embedded in the digest
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}
