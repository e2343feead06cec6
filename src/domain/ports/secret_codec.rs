//! Secret codec port.

use crate::domain::errors::{DecryptError, EncryptError};
use crate::domain::models::secret::{CipherBlob, PlaintextBytes};

/// Symmetric encryption of secret bytes under process-wide key material.
///
/// Implementations must be non-deterministic (fresh nonce per call) and must
/// report foreign ciphertext as `DecryptError::KeyMismatch`, never panic.
pub trait SecretCodec: Send + Sync {
    /// Encrypt under the current key epoch.
    fn encrypt(&self, plaintext: &PlaintextBytes) -> Result<CipherBlob, EncryptError>;

    /// Decrypt a blob produced under any epoch this codec still holds.
    fn decrypt(&self, blob: &CipherBlob) -> Result<PlaintextBytes, DecryptError>;

    /// Whether `raw` is a well-formed blob under key material this codec holds.
    fn is_encrypted(&self, raw: &[u8]) -> bool;

    /// Whether `blob` was sealed under an epoch older than the current one.
    fn is_stale(&self, blob: &CipherBlob) -> bool;

    /// Keep already-encrypted input as-is, encrypt anything else.
    fn wrap(&self, raw: &[u8]) -> Result<CipherBlob, EncryptError> {
        if self.is_encrypted(raw) {
            if let Ok(blob) = CipherBlob::from_bytes(raw.to_vec()) {
                return Ok(blob);
            }
        }
        self.encrypt(&PlaintextBytes::from(raw))
    }

    /// Re-encrypt a blob under the current epoch.
    fn rewrap(&self, blob: &CipherBlob) -> Result<CipherBlob, DecryptError> {
        let plaintext = self.decrypt(blob)?;
        Ok(self.encrypt(&plaintext)?)
    }
}
