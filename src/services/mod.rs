//! Services: lookup, detachment, transfer, binding and store maintenance.

pub mod binding;
pub mod context;
pub mod maintenance;
pub mod matchers;
pub mod provider_registry;
pub mod snapshot_engine;
pub mod transfer;

pub use binding::{BoundCertificate, CertificateBinding};
pub use context::CredentialContext;
pub use maintenance::{rotate_master_key, verify_store, RotationReport, VerifyReport};
pub use matchers::{first_or_none, CredentialsMatcher};
pub use provider_registry::{CredentialsProviderRegistry, RegistryBuilder};
pub use snapshot_engine::SnapshotEngine;
pub use transfer::{CredentialReceiver, CredentialTransfer};
