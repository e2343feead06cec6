//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces adapters must implement:
//! - SecretCodec: encryption of secret bytes at rest
//! - CredentialsStore: ordered, persisted credential collections
//! - RemoteConnector: byte streams to remote execution contexts

pub mod credentials_store;
pub mod remote_channel;
pub mod secret_codec;

pub use credentials_store::CredentialsStore;
pub use remote_channel::{RemoteConnector, RemoteStream};
pub use secret_codec::SecretCodec;
