//! CLI command implementations.

pub mod list;
#[cfg(unix)]
pub mod receive;
pub mod rotate_key;
#[cfg(unix)]
pub mod send;
pub mod verify;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::adapters::file::{FileCredentialsStore, StoreLayout};
use crate::domain::models::config::Config;
use crate::domain::ports::{CredentialsStore, SecretCodec};
use crate::infrastructure::crypto::{AesGcmCodec, FileMasterKeyProvider};
use crate::infrastructure::logging::AuditLogger;
use crate::services::provider_registry::CredentialsProviderRegistry;

/// Everything a command needs from the project directory: codec, audit
/// trail and every store file, opened in scope order.
pub struct Workspace {
    pub config: Config,
    pub codec: Arc<AesGcmCodec>,
    pub audit: AuditLogger,
    pub stores: Vec<Arc<FileCredentialsStore>>,
}

impl Workspace {
    pub fn open(project_dir: &Path, config: Config) -> Result<Self> {
        let key_path = resolve(project_dir, &config.crypto.master_key_path);
        let codec = Arc::new(AesGcmCodec::new(Arc::new(FileMasterKeyProvider::new(key_path))));

        let audit = if config.audit.enabled {
            AuditLogger::new(resolve(project_dir, &config.audit.path))
                .context("failed to open audit log")?
        } else {
            AuditLogger::disabled()
        };

        let layout = StoreLayout::new(resolve(project_dir, &config.store.root_dir));
        let paths = layout
            .discover()
            .with_context(|| format!("failed to scan store directory {}", layout.root().display()))?;

        let shared: Arc<dyn SecretCodec> = codec.clone();
        let mut stores = Vec::with_capacity(paths.len());
        for path in paths {
            let store = FileCredentialsStore::open_existing(&path, Arc::clone(&shared))
                .with_context(|| format!("failed to open store {}", path.display()))?
                .with_audit(audit.clone());
            let report = store.load_report();
            if report.unavailable > 0 {
                warn!(
                    path = %path.display(),
                    unavailable = report.unavailable,
                    "store holds secrets that cannot be decrypted"
                );
            }
            debug!(path = %path.display(), credentials = report.credentials, "opened store");
            stores.push(Arc::new(store));
        }
        stores.sort_by_key(|store| {
            (
                store.scope().wire_tag(),
                store.scope().path().map(str::to_string),
            )
        });

        Ok(Self {
            config,
            codec,
            audit,
            stores,
        })
    }

    /// Registry over every store, global first, then folders, then items.
    pub fn registry(&self) -> CredentialsProviderRegistry {
        CredentialsProviderRegistry::builder()
            .register_all(
                self.stores
                    .iter()
                    .map(|store| Arc::clone(store) as Arc<dyn CredentialsStore>),
            )
            .build()
    }

    pub fn shared_codec(&self) -> Arc<dyn SecretCodec> {
        self.codec.clone()
    }
}

fn resolve(project_dir: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
