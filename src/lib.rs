//! Keywarden - encrypted credential store
//!
//! Keywarden keeps credentials (certificates and username/password pairs)
//! encrypted at rest in per-scope stores, finds them through an ordered
//! registry of stores filtered by scope chain and domain requirements, and
//! detaches them into self-contained values that can be sent to a remote
//! execution context and bound into a build workspace there.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, typed errors and port traits
//! - **Adapters** (`adapters`): In-memory and file stores, wire envelope,
//!   channel framing
//! - **Service Layer** (`services`): Lookup, snapshots, transfer, binding,
//!   maintenance
//! - **Infrastructure Layer** (`infrastructure`): Crypto, configuration,
//!   logging and audit
//! - **CLI Layer** (`cli`): Operator command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use keywarden::{AesGcmCodec, CredentialsProviderRegistry, CredentialType, ScopeChain,
//!     RequirementSet, SnapshotEngine};
//!
//! let codec = Arc::new(AesGcmCodec::from_config(&config.crypto));
//! let registry = CredentialsProviderRegistry::builder().register(global_store).build();
//! let cert = registry.lookup_one(
//!     CredentialType::Certificate,
//!     &ScopeChain::for_item("team/release"),
//!     &RequirementSet::empty(),
//!     Some("myCert"),
//! );
//! let detached = SnapshotEngine::new(codec).snapshot(&cert.unwrap())?;
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::file::{FileCredentialsStore, StoreLayout};
pub use adapters::memory::InMemoryCredentialsStore;
pub use adapters::remote::WireEnvelope;
pub use domain::errors::{
    CredentialError, DecryptError, LookupError, RemoteTransferError, SnapshotError, StoreError,
};
pub use domain::models::{
    CipherBlob, Config, Credential, CredentialType, DetachedCredential, Domain, DomainRequirement,
    DomainSpecification, KeyStoreFormat, KeyStoreSource, PlaintextBytes, RequirementSet, Scope,
    ScopeChain, SecretBytes,
};
pub use domain::ports::{CredentialsStore, RemoteConnector, SecretCodec};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::crypto::AesGcmCodec;
pub use services::{
    CertificateBinding, CredentialContext, CredentialReceiver, CredentialTransfer,
    CredentialsProviderRegistry, SnapshotEngine,
};
