//! AES-256-GCM cipher for sensitive audit payloads at rest.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use audit_trail_application::SensitiveCipher;
use audit_trail_core::{AppError, AppResult};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const NONCE_LENGTH: usize = 12;

/// AES-256-GCM cipher producing base64 text of `nonce || ciphertext`.
#[derive(Clone)]
pub struct AesSensitiveCipher {
    cipher: Aes256Gcm,
}

impl AesSensitiveCipher {
    /// Creates a cipher from a 32-byte key.
    #[must_use]
    pub fn new(key_bytes: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new(key_bytes.into());
        Self { cipher }
    }

    /// Creates a cipher from a hex-encoded 32-byte key.
    pub fn from_hex(hex_key: &str) -> AppResult<Self> {
        let decoded = hex::decode(hex_key.trim()).map_err(|error| {
            AppError::Validation(format!("invalid AUDIT_ENCRYPTION_KEY hex: {error}"))
        })?;

        let key: [u8; 32] = decoded.as_slice().try_into().map_err(|_| {
            AppError::Validation(
                "AUDIT_ENCRYPTION_KEY must be exactly 32 bytes (64 hex chars)".to_owned(),
            )
        })?;

        Ok(Self::new(&key))
    }
}

impl SensitiveCipher for AesSensitiveCipher {
    fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|error| {
                AppError::Encryption(format!("failed to encrypt sensitive payload: {error}"))
            })?;

        let mut envelope = Vec::with_capacity(nonce.len() + ciphertext.len());
        envelope.extend_from_slice(&nonce);
        envelope.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(envelope))
    }

    fn decrypt(&self, ciphertext: &str) -> AppResult<String> {
        let envelope = STANDARD.decode(ciphertext.trim()).map_err(|error| {
            AppError::Decryption(format!("sensitive payload is not valid base64: {error}"))
        })?;

        if envelope.len() < NONCE_LENGTH {
            return Err(AppError::Decryption(
                "ciphertext too short: missing nonce".to_owned(),
            ));
        }

        let (nonce_bytes, encrypted) = envelope.split_at(NONCE_LENGTH);
        let nonce_array: [u8; NONCE_LENGTH] = nonce_bytes
            .try_into()
            .map_err(|_| AppError::Decryption("nonce must be exactly 12 bytes".to_owned()))?;
        let nonce = Nonce::from(nonce_array);

        let plaintext = self.cipher.decrypt(&nonce, encrypted).map_err(|error| {
            AppError::Decryption(format!("failed to decrypt sensitive payload: {error}"))
        })?;

        String::from_utf8(plaintext).map_err(|error| {
            AppError::Decryption(format!("decrypted payload is not UTF-8: {error}"))
        })
    }
}
