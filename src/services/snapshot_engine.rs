//! Detaches credentials so they can leave the process that owns them.
//!
//! Every keystore source is resolved by value: an `OnAgentDisk` keystore is
//! read now and sealed as `Uploaded` in the same format, so the snapshot no
//! longer depends on the file. An `Uploaded` keystore must decrypt under the
//! engine's codec. Ciphertext already held by the credential is copied
//! verbatim.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::errors::{KeyStoreError, SnapshotError};
use crate::domain::models::credential::{CertificateCredential, Credential, CredentialKind};
use crate::domain::models::keystore::KeyStoreSource;
use crate::domain::models::snapshot::DetachedCredential;
use crate::domain::ports::SecretCodec;
use crate::infrastructure::logging::{AuditEventType, AuditLogger};

pub struct SnapshotEngine {
    codec: Arc<dyn SecretCodec>,
    audit: AuditLogger,
}

impl SnapshotEngine {
    pub fn new(codec: Arc<dyn SecretCodec>) -> Self {
        Self {
            codec,
            audit: AuditLogger::disabled(),
        }
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn codec(&self) -> &Arc<dyn SecretCodec> {
        &self.codec
    }

    /// Produce a self-contained copy of `credential`.
    ///
    /// Snapshotting an already detached credential returns an equal value.
    #[instrument(skip_all, fields(id = %credential.id))]
    pub fn snapshot(&self, credential: &Credential) -> Result<DetachedCredential, SnapshotError> {
        let result = self.resolve(credential).and_then(|resolved| {
            DetachedCredential::try_new(resolved).map_err(|c| SnapshotError::UnresolvableSource {
                id: c.id,
                reason: "keystore source still references local state".to_string(),
            })
        });

        self.audit.record(
            AuditEventType::SnapshotTaken,
            "snapshot_engine",
            Some(&credential.id),
            result.is_ok(),
            Some(serde_json::json!({ "type": credential.credential_type().as_str() })),
        );
        result
    }

    fn resolve(&self, credential: &Credential) -> Result<Credential, SnapshotError> {
        let kind = match &credential.kind {
            CredentialKind::UsernamePassword(up) => CredentialKind::UsernamePassword(up.clone()),
            CredentialKind::Certificate(cert) => {
                let unresolvable = |e: KeyStoreError| SnapshotError::UnresolvableSource {
                    id: credential.id.clone(),
                    reason: e.to_string(),
                };
                let key_store_source = match &cert.key_store_source {
                    KeyStoreSource::Uploaded { .. } => {
                        // Must open under this codec; the plaintext is dropped at once.
                        cert.key_store_source
                            .keystore_bytes(self.codec.as_ref())
                            .map_err(unresolvable)?;
                        cert.key_store_source.clone()
                    }
                    KeyStoreSource::OnAgentDisk { path, format } => {
                        let bytes = cert
                            .key_store_source
                            .keystore_bytes(self.codec.as_ref())
                            .map_err(unresolvable)?;
                        debug!(path = %path.display(), format = format.as_str(), "resolved on-disk keystore");
                        KeyStoreSource::upload(self.codec.as_ref(), &bytes, *format)?
                    }
                };
                CredentialKind::Certificate(CertificateCredential {
                    password: cert.password.clone(),
                    key_store_source,
                })
            }
        };

        Ok(Credential {
            id: credential.id.clone(),
            description: credential.description.clone(),
            scope: credential.scope.clone(),
            kind,
        })
    }
}
