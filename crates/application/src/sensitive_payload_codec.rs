use std::sync::Arc;

use audit_trail_core::{AppError, AppResult};
use audit_trail_domain::{FieldSnapshot, SensitiveDiff};
use tracing::warn;

use crate::SensitiveCipher;

/// Result of opening a stored sensitive blob.
#[derive(Debug, Clone, PartialEq)]
pub enum DecryptOutcome {
    /// Blob decrypted and decoded.
    Decrypted(SensitiveDiff),
    /// Blob could not be opened with the configured key or decoded.
    Failed,
}

/// Serializes and protects the sensitive subset of before/after snapshots.
#[derive(Clone)]
pub struct SensitivePayloadCodec {
    cipher: Arc<dyn SensitiveCipher>,
}

impl SensitivePayloadCodec {
    /// Creates a codec from a cipher implementation.
    #[must_use]
    pub fn new(cipher: Arc<dyn SensitiveCipher>) -> Self {
        Self { cipher }
    }

    /// Encrypts sensitive before/after values.
    ///
    /// Returns `Ok(None)` when both sides are empty: no ciphertext is produced
    /// for a no-op.
    pub fn encrypt_diff(
        &self,
        before: FieldSnapshot,
        after: FieldSnapshot,
    ) -> AppResult<Option<String>> {
        let diff = SensitiveDiff::new(before, after);
        if diff.is_empty() {
            return Ok(None);
        }

        let plaintext = serde_json::to_string(&diff).map_err(|error| {
            AppError::Encryption(format!("failed to serialize sensitive payload: {error}"))
        })?;

        self.cipher.encrypt(plaintext.as_str()).map(Some)
    }

    /// Decrypts a stored blob. Never fails outward.
    #[must_use]
    pub fn decrypt_diff(&self, ciphertext: &str) -> DecryptOutcome {
        let plaintext = match self.cipher.decrypt(ciphertext) {
            Ok(plaintext) => plaintext,
            Err(error) => {
                warn!(error = %error, "failed to decrypt sensitive audit payload");
                return DecryptOutcome::Failed;
            }
        };

        match serde_json::from_str::<SensitiveDiff>(plaintext.as_str()) {
            Ok(diff) => DecryptOutcome::Decrypted(diff),
            Err(error) => {
                warn!(error = %error, "failed to decode sensitive audit payload");
                DecryptOutcome::Failed
            }
        }
    }
}
