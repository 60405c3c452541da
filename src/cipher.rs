//! AES-256-GCM encryption for the stored external-source secret.
//!
//! The stored form is `base64(nonce || ciphertext)`: a fresh 96-bit nonce per
//! value, followed by the ciphertext with its authentication tag. One column,
//! no separate nonce field.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use thiserror::Error;

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),
    #[error("encryption failed")]
    Encrypt,
    #[error("malformed ciphertext: {0}")]
    Malformed(&'static str),
    /// Wrong key or tampered data; GCM does not say which.
    #[error("ciphertext failed authentication")]
    Authentication,
    #[error("decrypted secret is not valid UTF-8")]
    NotUtf8,
}

/// Holds the process-wide key. Built once at startup and shared read-only.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(key: &[u8]) -> Result<Self, CipherError> {
        if key.len() != KEY_SIZE {
            return Err(CipherError::InvalidKey(format!(
                "expected {KEY_SIZE} bytes, got {}",
                key.len()
            )));
        }
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn from_base64_key(key_base64: &str) -> Result<Self, CipherError> {
        let key = BASE64
            .decode(key_base64.trim())
            .map_err(|e| CipherError::InvalidKey(format!("not base64: {e}")))?;
        Self::new(&key)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(out))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String, CipherError> {
        let raw = BASE64
            .decode(stored)
            .map_err(|_| CipherError::Malformed("not base64"))?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CipherError::Malformed("too short"));
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::NotUtf8)
    }
}
