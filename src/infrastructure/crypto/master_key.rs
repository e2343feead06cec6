//! Master key material and where it comes from.
//!
//! A [`KeyRing`] holds every key epoch this installation has used. The newest
//! epoch encrypts; older epochs only decrypt until their blobs are rewrapped.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::MasterKeyError;
use crate::domain::models::secret::FINGERPRINT_LEN;

/// AES-256 key length.
pub const MASTER_KEY_LEN: usize = 32;

const RING_FILE_VERSION: u32 = 1;

/// One key epoch.
#[derive(Clone)]
pub struct EpochKey {
    epoch: u32,
    key: Zeroizing<[u8; MASTER_KEY_LEN]>,
    fingerprint: [u8; FINGERPRINT_LEN],
}

impl EpochKey {
    fn new(epoch: u32, key: Zeroizing<[u8; MASTER_KEY_LEN]>) -> Self {
        let fingerprint = fingerprint_of(key.as_slice());
        Self {
            epoch,
            key,
            fingerprint,
        }
    }

    fn generate(epoch: u32) -> Self {
        let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
        rand::rng().fill_bytes(key.as_mut_slice());
        Self::new(epoch, key)
    }

    pub const fn epoch(&self) -> u32 {
        self.epoch
    }

    pub fn key(&self) -> &[u8] {
        self.key.as_slice()
    }

    pub const fn fingerprint(&self) -> [u8; FINGERPRINT_LEN] {
        self.fingerprint
    }
}

impl fmt::Debug for EpochKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpochKey")
            .field("epoch", &self.epoch)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// First bytes of SHA-256 over the key. Identifies a key without revealing it.
pub fn fingerprint_of(key: &[u8]) -> [u8; FINGERPRINT_LEN] {
    let digest = Sha256::digest(key);
    let mut fingerprint = [0u8; FINGERPRINT_LEN];
    fingerprint.copy_from_slice(&digest[..FINGERPRINT_LEN]);
    fingerprint
}

/// Ordered key epochs, oldest first. Never empty.
#[derive(Clone, Debug)]
pub struct KeyRing {
    keys: Vec<EpochKey>,
}

impl KeyRing {
    /// A ring with a single fresh random key at epoch 1.
    pub fn generate() -> Self {
        Self {
            keys: vec![EpochKey::generate(1)],
        }
    }

    /// Build a ring from raw `(epoch, key)` pairs.
    pub fn from_keys(
        keys: impl IntoIterator<Item = (u32, Zeroizing<Vec<u8>>)>,
    ) -> Result<Self, MasterKeyError> {
        let mut ring = Vec::new();
        for (epoch, raw) in keys {
            if raw.len() != MASTER_KEY_LEN {
                return Err(MasterKeyError::InvalidKeyLength {
                    epoch,
                    expected: MASTER_KEY_LEN,
                    found: raw.len(),
                });
            }
            if ring.last().is_some_and(|prev: &EpochKey| prev.epoch >= epoch) {
                return Err(MasterKeyError::EpochOrder(epoch));
            }
            let mut key = Zeroizing::new([0u8; MASTER_KEY_LEN]);
            key.copy_from_slice(&raw);
            ring.push(EpochKey::new(epoch, key));
        }
        if ring.is_empty() {
            return Err(MasterKeyError::EmptyRing);
        }
        Ok(Self { keys: ring })
    }

    /// The epoch used for new encryptions.
    pub fn current(&self) -> &EpochKey {
        // Construction guarantees at least one key.
        &self.keys[self.keys.len() - 1]
    }

    pub fn by_fingerprint(&self, fingerprint: &[u8; FINGERPRINT_LEN]) -> Option<&EpochKey> {
        self.keys.iter().find(|k| &k.fingerprint == fingerprint)
    }

    pub fn epochs(&self) -> Vec<u32> {
        self.keys.iter().map(EpochKey::epoch).collect()
    }

    /// A copy of this ring with one new random epoch appended.
    #[must_use]
    pub fn rotated(&self) -> Self {
        let mut keys = self.keys.clone();
        keys.push(EpochKey::generate(self.current().epoch + 1));
        Self { keys }
    }
}

/// Source of the key ring.
pub trait MasterKeyProvider: Send + Sync {
    /// Return the ring, creating a first key if none exists yet.
    fn load_or_create(&self) -> Result<KeyRing, MasterKeyError>;

    /// Append a new epoch, persist it, and return the new ring.
    fn rotate(&self) -> Result<KeyRing, MasterKeyError>;
}

/// Holds the ring in memory only. Used by tests and embedded callers.
pub struct StaticKeyProvider {
    ring: Mutex<KeyRing>,
}

impl StaticKeyProvider {
    pub const fn new(ring: KeyRing) -> Self {
        Self {
            ring: Mutex::new(ring),
        }
    }

    pub fn generate() -> Self {
        Self::new(KeyRing::generate())
    }
}

impl MasterKeyProvider for StaticKeyProvider {
    fn load_or_create(&self) -> Result<KeyRing, MasterKeyError> {
        self.ring
            .lock()
            .map(|ring| ring.clone())
            .map_err(|_| MasterKeyError::LockPoisoned)
    }

    fn rotate(&self) -> Result<KeyRing, MasterKeyError> {
        let mut ring = self.ring.lock().map_err(|_| MasterKeyError::LockPoisoned)?;
        *ring = ring.rotated();
        Ok(ring.clone())
    }
}

#[derive(Serialize, Deserialize)]
struct RingFile {
    version: u32,
    keys: Vec<RingFileKey>,
}

#[derive(Serialize, Deserialize)]
struct RingFileKey {
    epoch: u32,
    key: String,
    created_at: DateTime<Utc>,
}

/// Persists the ring as a JSON file readable only by its owner.
pub struct FileMasterKeyProvider {
    path: PathBuf,
    // Serializes create and rotate within this process.
    write_lock: Mutex<()>,
}

impl FileMasterKeyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<KeyRing>, MasterKeyError> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => Zeroizing::new(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(MasterKeyError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let file: RingFile = serde_json::from_slice(&raw).map_err(|e| self.corrupt(e))?;
        if file.version != RING_FILE_VERSION {
            return Err(self.corrupt(format!("unsupported version {}", file.version)));
        }
        let mut keys = Vec::with_capacity(file.keys.len());
        for entry in file.keys {
            let key = BASE64_STANDARD
                .decode(entry.key.as_bytes())
                .map_err(|e| self.corrupt(e))?;
            keys.push((entry.epoch, Zeroizing::new(key)));
        }
        KeyRing::from_keys(keys).map(Some)
    }

    fn write(&self, ring: &KeyRing) -> Result<(), MasterKeyError> {
        let io_err = |source| MasterKeyError::Io {
            path: self.path.clone(),
            source,
        };
        let now = Utc::now();
        let file = RingFile {
            version: RING_FILE_VERSION,
            keys: ring
                .keys
                .iter()
                .map(|k| RingFileKey {
                    epoch: k.epoch,
                    key: BASE64_STANDARD.encode(k.key()),
                    created_at: now,
                })
                .collect(),
        };
        let json = Zeroizing::new(serde_json::to_vec_pretty(&file).map_err(|e| self.corrupt(e))?);

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(io_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".master-key")
            .tempfile_in(dir)
            .map_err(io_err)?;
        restrict_permissions(tmp.path()).map_err(io_err)?;
        tmp.write_all(&json).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;
        Ok(())
    }

    fn corrupt(&self, reason: impl fmt::Display) -> MasterKeyError {
        MasterKeyError::Corrupt {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl MasterKeyProvider for FileMasterKeyProvider {
    fn load_or_create(&self) -> Result<KeyRing, MasterKeyError> {
        if let Some(ring) = self.read()? {
            tracing::debug!(path = %self.path.display(), epochs = ?ring.epochs(), "Loaded master key ring");
            return Ok(ring);
        }
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| MasterKeyError::LockPoisoned)?;
        // Another thread may have created it while we waited.
        if let Some(ring) = self.read()? {
            return Ok(ring);
        }
        tracing::info!(path = %self.path.display(), "No master key found, generating new one");
        let ring = KeyRing::generate();
        self.write(&ring)?;
        Ok(ring)
    }

    fn rotate(&self) -> Result<KeyRing, MasterKeyError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| MasterKeyError::LockPoisoned)?;
        let ring = match self.read()? {
            Some(ring) => ring.rotated(),
            None => KeyRing::generate(),
        };
        self.write(&ring)?;
        tracing::info!(
            path = %self.path.display(),
            epoch = ring.current().epoch(),
            "Master key rotated"
        );
        Ok(ring)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
