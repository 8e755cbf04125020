//! Encryption of third-party access tokens at rest.
//!
//! Sealed values are base64(nonce || AES-256-GCM ciphertext).

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::AppError;

const AES_256_KEY_BYTES: usize = 32;
const AES_GCM_NONCE_BYTES: usize = 12;

/// Seals and opens stored GitHub access tokens
pub struct TokenCipher {
    cipher: Aes256Gcm,
}

impl TokenCipher {
    pub fn new(key: &[u8]) -> Result<Self, AppError> {
        let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| {
            AppError::Encryption(format!(
                "invalid token encryption key length (expected {} bytes)",
                AES_256_KEY_BYTES
            ))
        })?;

        Ok(Self { cipher })
    }

    /// Build from `auth.token_encryption_key`, falling back to a key
    /// derived from the session secret.
    pub fn from_config(config: &crate::config::AuthConfig) -> Result<Self, AppError> {
        match config.token_encryption_key.as_deref() {
            Some(encoded) => Self::new(&Self::decode_key(encoded)?),
            None => {
                let mut hasher = Sha256::new();
                hasher.update(b"codevault:github-token:");
                hasher.update(config.session_secret.as_bytes());
                Self::new(&hasher.finalize())
            }
        }
    }

    /// Decode and length-check a base64 key
    pub fn decode_key(encoded: &str) -> Result<Vec<u8>, AppError> {
        let key = STANDARD.decode(encoded.trim()).map_err(|_| {
            AppError::Config(
                "auth.token_encryption_key must be valid base64-encoded bytes".to_string(),
            )
        })?;

        if key.len() != AES_256_KEY_BYTES {
            return Err(AppError::Config(format!(
                "auth.token_encryption_key must decode to {} bytes",
                AES_256_KEY_BYTES
            )));
        }

        Ok(key)
    }

    pub fn seal(&self, plaintext: &str) -> Result<String, AppError> {
        let mut nonce = [0_u8; AES_GCM_NONCE_BYTES];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| AppError::Encryption("token encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(AES_GCM_NONCE_BYTES + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    pub fn open(&self, sealed: &str) -> Result<String, AppError> {
        let data = STANDARD
            .decode(sealed)
            .map_err(|_| AppError::Encryption("sealed token is not base64".to_string()))?;
        if data.len() <= AES_GCM_NONCE_BYTES {
            return Err(AppError::Encryption("sealed token is too short".to_string()));
        }

        let (nonce, ciphertext) = data.split_at(AES_GCM_NONCE_BYTES);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::Encryption("token decryption failed".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|_| AppError::Encryption("sealed token is not UTF-8".to_string()))
    }
}
