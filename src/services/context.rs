//! Explicitly passed bundle of the pieces a credential consumer needs.

use std::path::Path;
use std::sync::Arc;

use crate::domain::errors::{BindingError, CredentialError};
use crate::domain::models::config::{BindingConfig, RemoteConfig};
use crate::domain::models::credential::{Credential, CredentialType, ScopeChain};
use crate::domain::models::credential_domain::RequirementSet;
use crate::domain::models::snapshot::DetachedCredential;
use crate::domain::ports::{RemoteConnector, SecretCodec};
use crate::infrastructure::logging::AuditLogger;
use crate::services::binding::{BoundCertificate, CertificateBinding};
use crate::services::provider_registry::CredentialsProviderRegistry;
use crate::services::snapshot_engine::SnapshotEngine;
use crate::services::transfer::CredentialTransfer;

pub struct CredentialContext {
    registry: CredentialsProviderRegistry,
    codec: Arc<dyn SecretCodec>,
    snapshots: SnapshotEngine,
    audit: AuditLogger,
}

impl CredentialContext {
    pub fn new(registry: CredentialsProviderRegistry, codec: Arc<dyn SecretCodec>) -> Self {
        Self::with_audit(registry, codec, AuditLogger::disabled())
    }

    pub fn with_audit(
        registry: CredentialsProviderRegistry,
        codec: Arc<dyn SecretCodec>,
        audit: AuditLogger,
    ) -> Self {
        let snapshots = SnapshotEngine::new(Arc::clone(&codec)).with_audit(audit.clone());
        Self {
            registry,
            codec,
            snapshots,
            audit,
        }
    }

    pub const fn registry(&self) -> &CredentialsProviderRegistry {
        &self.registry
    }

    pub fn codec(&self) -> &dyn SecretCodec {
        self.codec.as_ref()
    }

    pub const fn snapshot_engine(&self) -> &SnapshotEngine {
        &self.snapshots
    }

    pub fn lookup_one(
        &self,
        wanted: CredentialType,
        chain: &ScopeChain,
        requirements: &RequirementSet,
        id: Option<&str>,
    ) -> Option<Credential> {
        self.registry.lookup_one(wanted, chain, requirements, id)
    }

    /// Look up `id` and detach it in one step.
    pub fn detach(
        &self,
        wanted: CredentialType,
        chain: &ScopeChain,
        requirements: &RequirementSet,
        id: &str,
    ) -> Result<DetachedCredential, CredentialError> {
        let credential = self.registry.require(wanted, chain, requirements, id)?;
        Ok(self.snapshots.snapshot(&credential)?)
    }

    pub fn transfer(
        &self,
        connector: Arc<dyn RemoteConnector>,
        config: RemoteConfig,
    ) -> CredentialTransfer {
        CredentialTransfer::new(connector, Arc::clone(&self.codec), config)
            .with_audit(self.audit.clone())
    }

    pub fn bind(
        &self,
        credential: &DetachedCredential,
        binding: &CertificateBinding,
        workspace: &Path,
        config: &BindingConfig,
    ) -> Result<BoundCertificate, BindingError> {
        binding
            .clone()
            .with_audit(self.audit.clone())
            .bind(credential, workspace, self.codec.as_ref(), config)
    }
}
