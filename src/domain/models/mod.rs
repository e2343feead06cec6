//! Domain models for the credential core.

pub mod config;
pub mod credential;
pub mod credential_domain;
pub mod keystore;
pub mod secret;
pub mod snapshot;
pub mod store_contents;

pub use config::{
    AuditConfig, BindingConfig, Config, CryptoConfig, LoggingConfig, RemoteConfig, StoreConfig,
};
pub use credential::{
    CertificateCredential, Credential, CredentialKind, CredentialType, Scope, ScopeChain,
    UsernamePasswordCredential,
};
pub use credential_domain::{
    Domain, DomainRequirement, DomainSpecification, RequirementSet, SpecificationResult,
};
pub use keystore::{KeyStoreFormat, KeyStoreSource};
pub use secret::{CipherBlob, PlaintextBytes, SecretBytes};
pub use snapshot::DetachedCredential;
pub use store_contents::{DomainCredentials, StoreContents};
