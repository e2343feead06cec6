//! Encryption at rest.
//!
//! - `master_key`: the key ring and its providers
//! - `aes_codec`: AES-256-GCM `SecretCodec`

mod aes_codec;
mod error;
mod master_key;

pub use aes_codec::AesGcmCodec;
pub use error::MasterKeyError;
pub use master_key::{
    fingerprint_of, EpochKey, FileMasterKeyProvider, KeyRing, MasterKeyProvider,
    StaticKeyProvider, MASTER_KEY_LEN,
};
