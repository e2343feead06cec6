//! Domain errors for the keywarden credential core.
//!
//! Each component gets its own typed error so callers can tell a missing
//! credential apart from an unreadable one. `CredentialError` folds them
//! together for callers that only need to report.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to turn a ciphertext blob back into plaintext.
///
/// Always recoverable: a store holding an undecryptable secret keeps
/// working, the secret is just reported as unavailable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecryptError {
    /// The blob was produced under key material this process does not hold,
    /// or its authentication tag does not verify.
    #[error("ciphertext was not produced under the current key material")]
    KeyMismatch,

    #[error("malformed ciphertext: {0}")]
    Malformed(String),

    #[error("key material unavailable: {0}")]
    KeyUnavailable(String),
}

/// Failure to produce ciphertext.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncryptError {
    #[error("key material unavailable: {0}")]
    KeyUnavailable(String),

    #[error("cipher failure: {0}")]
    Cipher(String),
}

impl From<EncryptError> for DecryptError {
    fn from(err: EncryptError) -> Self {
        match err {
            EncryptError::KeyUnavailable(msg) | EncryptError::Cipher(msg) => {
                Self::KeyUnavailable(msg)
            }
        }
    }
}

/// Failure to obtain raw keystore bytes from a `KeyStoreSource`.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    #[error("uploaded keystore unavailable: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("keystore file {path} unreadable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("keystore file {0} is empty")]
    Empty(PathBuf),
}

/// Credential store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("credential id already present in store: {0}")]
    DuplicateId(String),

    #[error("domain not found: {0}")]
    DomainNotFound(String),

    #[error("domain already present in store: {0}")]
    DuplicateDomain(String),

    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    #[error("unsupported store format version {found} (supported: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error("store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Lookup failures. A miss is normally an empty result; this error exists
/// for callers that require a credential to be present.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("no credential matches id '{id}'")]
    NotFound { id: String },
}

/// Failures while detaching a credential.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("credential '{id}' has a source that cannot be resolved: {reason}")]
    UnresolvableSource { id: String, reason: String },

    #[error("resolved keystore could not be sealed: {0}")]
    Encrypt(#[from] EncryptError),
}

/// Failures encoding or decoding the remote wire envelope.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("not a credential envelope")]
    BadMagic,

    #[error("unsupported envelope version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown {field} tag {tag}")]
    UnknownTag { field: &'static str, tag: u8 },

    #[error("envelope truncated while reading {0}")]
    Truncated(&'static str),

    #[error("field {0} is not valid UTF-8")]
    InvalidUtf8(&'static str),

    #[error("field {field} exceeds {max} bytes")]
    FieldTooLarge { field: &'static str, max: usize },

    #[error("{0} trailing bytes after envelope")]
    TrailingBytes(usize),

    #[error("secret field could not be opened: {0}")]
    Decrypt(#[from] DecryptError),

    #[error("secret field could not be sealed: {0}")]
    Encrypt(#[from] EncryptError),

    #[error("keystore could not be read: {0}")]
    KeyStore(#[from] KeyStoreError),
}

/// Failures delivering a detached credential to a remote execution context.
///
/// Reported to the invoking build step; the core never retries.
#[derive(Debug, Error)]
pub enum RemoteTransferError {
    #[error("remote channel connect timed out after {0} ms")]
    ConnectTimeout(u64),

    #[error("remote channel handshake timed out after {0} ms")]
    HandshakeTimeout(u64),

    #[error("credential transfer timed out after {0} ms")]
    TransferTimeout(u64),

    #[error("remote channel unavailable: {0}")]
    Unavailable(String),

    #[error("remote peer rejected credential: {0}")]
    Rejected(String),

    #[error("remote protocol violation: {0}")]
    Protocol(String),

    #[error("channel i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("envelope error: {0}")]
    Wire(#[from] WireError),
}

/// Failures binding a certificate into a workspace.
#[derive(Debug, Error)]
pub enum BindingError {
    #[error("credential '{0}' is not a certificate credential")]
    NotACertificate(String),

    #[error("keystore unavailable: {0}")]
    KeyStore(#[from] KeyStoreError),

    #[error("password unavailable: {0}")]
    Password(#[from] DecryptError),

    #[error("workspace i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the credential core.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error(transparent)]
    Decrypt(#[from] DecryptError),

    #[error(transparent)]
    Encrypt(#[from] EncryptError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Transfer(#[from] RemoteTransferError),

    #[error(transparent)]
    Binding(#[from] BindingError),
}

pub type CredentialResult<T> = Result<T, CredentialError>;
