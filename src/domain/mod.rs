//! Domain layer for the keywarden credential core
//!
//! Pure models, typed errors and the port traits that adapters implement.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{
    BindingError, CredentialError, CredentialResult, DecryptError, EncryptError, KeyStoreError,
    LookupError, RemoteTransferError, SnapshotError, StoreError, WireError,
};
