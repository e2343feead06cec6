use std::path::PathBuf;

use thiserror::Error;

/// Failures obtaining or persisting master key material.
#[derive(Debug, Error)]
pub enum MasterKeyError {
    #[error("key ring file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key ring file {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    #[error("key ring is empty")]
    EmptyRing,

    #[error("invalid key for epoch {epoch}: expected {expected} bytes, found {found}")]
    InvalidKeyLength {
        epoch: u32,
        expected: usize,
        found: usize,
    },

    #[error("key ring epochs must be strictly increasing (epoch {0} out of order)")]
    EpochOrder(u32),

    #[error("key ring lock poisoned")]
    LockPoisoned,
}
