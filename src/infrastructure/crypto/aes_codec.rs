//! AES-256-GCM implementation of [`SecretCodec`].

use std::sync::{Arc, Mutex, RwLock};

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::RngCore;

use super::master_key::{EpochKey, FileMasterKeyProvider, KeyRing, MasterKeyProvider, StaticKeyProvider};
use super::MasterKeyError;
use crate::domain::errors::{DecryptError, EncryptError};
use crate::domain::models::config::CryptoConfig;
use crate::domain::models::secret::{CipherBlob, PlaintextBytes, FINGERPRINT_LEN, NONCE_LEN};
use crate::domain::ports::SecretCodec;

/// Bytes of the blob header authenticated as associated data
/// (marker, epoch, fingerprint).
const AAD_LEN: usize = 1 + 4 + FINGERPRINT_LEN;

/// Encrypts secrets under the current epoch of a [`KeyRing`].
///
/// The ring is fetched from the provider on first use and cached for the
/// codec's lifetime; only [`AesGcmCodec::rotate`] replaces it.
pub struct AesGcmCodec {
    provider: Arc<dyn MasterKeyProvider>,
    ring: RwLock<Option<Arc<KeyRing>>>,
    init: Mutex<()>,
}

impl AesGcmCodec {
    pub fn new(provider: Arc<dyn MasterKeyProvider>) -> Self {
        Self {
            provider,
            ring: RwLock::new(None),
            init: Mutex::new(()),
        }
    }

    /// Codec backed by the configured key ring file.
    pub fn from_config(config: &CryptoConfig) -> Self {
        Self::new(Arc::new(FileMasterKeyProvider::new(&config.master_key_path)))
    }

    /// Codec with a random in-memory key. Nothing it encrypts survives the
    /// process.
    pub fn ephemeral() -> Self {
        Self::new(Arc::new(StaticKeyProvider::generate()))
    }

    /// Current key epoch.
    pub fn current_epoch(&self) -> Result<u32, MasterKeyError> {
        Ok(self.ring()?.current().epoch())
    }

    /// Append a new key epoch. Existing blobs stay decryptable and report
    /// stale until rewrapped.
    pub fn rotate(&self) -> Result<u32, MasterKeyError> {
        let _guard = self.init.lock().map_err(|_| MasterKeyError::LockPoisoned)?;
        let ring = Arc::new(self.provider.rotate()?);
        let epoch = ring.current().epoch();
        *self.ring.write().map_err(|_| MasterKeyError::LockPoisoned)? = Some(ring);
        Ok(epoch)
    }

    fn ring(&self) -> Result<Arc<KeyRing>, MasterKeyError> {
        if let Some(ring) = self.cached()? {
            return Ok(ring);
        }
        let _guard = self.init.lock().map_err(|_| MasterKeyError::LockPoisoned)?;
        if let Some(ring) = self.cached()? {
            return Ok(ring);
        }
        let ring = Arc::new(self.provider.load_or_create()?);
        *self.ring.write().map_err(|_| MasterKeyError::LockPoisoned)? = Some(Arc::clone(&ring));
        Ok(ring)
    }

    fn cached(&self) -> Result<Option<Arc<KeyRing>>, MasterKeyError> {
        self.ring
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| MasterKeyError::LockPoisoned)
    }
}

fn cipher_for(key: &EpochKey) -> Result<Aes256Gcm, EncryptError> {
    Aes256Gcm::new_from_slice(key.key()).map_err(|e| EncryptError::Cipher(e.to_string()))
}

impl SecretCodec for AesGcmCodec {
    fn encrypt(&self, plaintext: &PlaintextBytes) -> Result<CipherBlob, EncryptError> {
        let ring = self
            .ring()
            .map_err(|e| EncryptError::KeyUnavailable(e.to_string()))?;
        let key = ring.current();
        let cipher = cipher_for(key)?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::rng().fill_bytes(&mut nonce);

        // Header is authenticated so epoch and fingerprint cannot be swapped.
        let header = CipherBlob::assemble(key.epoch(), key.fingerprint(), nonce, &[]);
        let sealed = cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext.as_bytes(),
                    aad: &header.as_bytes()[..AAD_LEN],
                },
            )
            .map_err(|e| EncryptError::Cipher(e.to_string()))?;

        Ok(CipherBlob::assemble(
            key.epoch(),
            key.fingerprint(),
            nonce,
            &sealed,
        ))
    }

    fn decrypt(&self, blob: &CipherBlob) -> Result<PlaintextBytes, DecryptError> {
        let ring = self
            .ring()
            .map_err(|e| DecryptError::KeyUnavailable(e.to_string()))?;
        let key = ring
            .by_fingerprint(&blob.fingerprint())
            .ok_or(DecryptError::KeyMismatch)?;
        let cipher = cipher_for(key)?;

        cipher
            .decrypt(
                Nonce::from_slice(blob.nonce()),
                Payload {
                    msg: blob.sealed(),
                    aad: &blob.as_bytes()[..AAD_LEN],
                },
            )
            .map(PlaintextBytes::new)
            .map_err(|_| DecryptError::KeyMismatch)
    }

    fn is_encrypted(&self, raw: &[u8]) -> bool {
        let Ok(blob) = CipherBlob::from_bytes(raw.to_vec()) else {
            return false;
        };
        self.ring()
            .is_ok_and(|ring| ring.by_fingerprint(&blob.fingerprint()).is_some())
    }

    fn is_stale(&self, blob: &CipherBlob) -> bool {
        self.ring()
            .is_ok_and(|ring| blob.epoch() < ring.current().epoch())
    }
}
