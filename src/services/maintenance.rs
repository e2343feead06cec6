//! Store maintenance: secret verification and master key rotation.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::adapters::file::{FileCredentialsStore, LoadReport};
use crate::domain::models::credential::Scope;
use crate::domain::ports::{CredentialsStore, SecretCodec};
use crate::infrastructure::crypto::AesGcmCodec;
use crate::infrastructure::logging::{AuditEventType, AuditLogger};

/// A secret that failed to decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnavailableSecret {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    pub scope: Scope,
    pub credentials: usize,
    pub secrets_checked: usize,
    pub unavailable: Vec<UnavailableSecret>,
}

impl VerifyReport {
    pub fn is_healthy(&self) -> bool {
        self.unavailable.is_empty()
    }
}

/// Decrypt every secret in `store` and report the ones that fail.
///
/// Plaintext is dropped as soon as it has been produced.
#[instrument(skip_all, fields(scope = %store.scope()))]
pub fn verify_store(store: &dyn CredentialsStore, codec: &dyn SecretCodec) -> VerifyReport {
    let contents = store.contents();
    let mut report = VerifyReport {
        scope: store.scope().clone(),
        credentials: contents.len(),
        secrets_checked: 0,
        unavailable: Vec::new(),
    };
    for credential in contents.iter() {
        for secret in credential.secrets() {
            report.secrets_checked += 1;
            if let Err(e) = secret.decrypt(codec) {
                warn!(id = %credential.id, error = %e, "secret unavailable");
                report.unavailable.push(UnavailableSecret {
                    id: credential.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRotation {
    pub scope: Scope,
    pub rewrapped: usize,
    pub unavailable: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RotationReport {
    pub epoch: u32,
    pub stores: Vec<StoreRotation>,
}

/// Append a master key epoch, then re-encrypt every store under it.
///
/// Stores are rewrapped one at a time; a failure leaves the remaining
/// stores on the previous epoch, which stays decryptable.
#[instrument(skip_all, fields(stores = stores.len()))]
pub fn rotate_master_key(
    codec: &AesGcmCodec,
    stores: &[Arc<FileCredentialsStore>],
    audit: &AuditLogger,
) -> Result<RotationReport> {
    let rotated = codec.rotate().context("failed to rotate master key");
    audit.record(
        AuditEventType::KeyRotated,
        "maintenance",
        None,
        rotated.is_ok(),
        rotated
            .as_ref()
            .ok()
            .map(|epoch| serde_json::json!({ "epoch": epoch })),
    );
    let epoch = rotated?;
    info!(epoch, "master key rotated");

    let mut report = RotationReport {
        epoch,
        stores: Vec::with_capacity(stores.len()),
    };
    for store in stores {
        let LoadReport {
            rewrapped,
            unavailable,
            ..
        } = store
            .rewrap()
            .with_context(|| format!("failed to rewrap store {}", store.path().display()))?;
        report.stores.push(StoreRotation {
            scope: store.scope().clone(),
            rewrapped,
            unavailable,
        });
    }
    Ok(report)
}
