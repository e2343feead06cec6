//! JSON file implementation of CredentialsStore.
//!
//! Wraps an [`InMemoryCredentialsStore`] and adds persistence: the file is
//! read once at open, and `save()` atomically replaces it with the current
//! contents (temp file in the same directory, fsync, rename).

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, instrument, warn};

use super::format::StoreDocument;
use crate::adapters::memory::InMemoryCredentialsStore;
use crate::domain::errors::StoreError;
use crate::domain::models::credential::{Credential, Scope};
use crate::domain::models::credential_domain::Domain;
use crate::domain::models::store_contents::StoreContents;
use crate::domain::ports::{CredentialsStore, SecretCodec};
use crate::infrastructure::logging::{AuditEventType, AuditLogger};

const TEMP_SUFFIX: &str = ".tmp";

/// Outcome of the maintenance pass run when a store is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub credentials: usize,
    /// Secrets re-encrypted under the current key epoch.
    pub rewrapped: usize,
    /// Secrets that could not be decrypted and were left as they were.
    pub unavailable: usize,
}

pub struct FileCredentialsStore {
    path: PathBuf,
    inner: InMemoryCredentialsStore,
    codec: Arc<dyn SecretCodec>,
    // Serializes saves so two writers never race on the rename.
    save_lock: Mutex<()>,
    audit: AuditLogger,
    report: LoadReport,
}

impl FileCredentialsStore {
    /// Open the store at `path` for `scope`, creating an empty one if the
    /// file does not exist yet.
    pub fn open(
        path: impl Into<PathBuf>,
        scope: Scope,
        codec: Arc<dyn SecretCodec>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        sweep_temp_files(&path);
        let contents = match read_document(&path)? {
            Some(document) => {
                if document.scope != scope {
                    warn!(
                        path = %path.display(),
                        file_scope = %document.scope,
                        scope = %scope,
                        "store file belongs to a different scope, adopting requested scope"
                    );
                }
                document.into_contents()
            }
            None => StoreContents::new(),
        };
        Self::from_contents(path, scope, codec, contents)
    }

    /// Open an existing store file, taking the scope recorded in it.
    pub fn open_existing(
        path: impl Into<PathBuf>,
        codec: Arc<dyn SecretCodec>,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        sweep_temp_files(&path);
        let document = read_document(&path)?.ok_or_else(|| StoreError::Io {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "store file not found"),
        })?;
        let scope = document.scope.clone();
        Self::from_contents(path, scope, codec, document.into_contents())
    }

    fn from_contents(
        path: PathBuf,
        scope: Scope,
        codec: Arc<dyn SecretCodec>,
        mut contents: StoreContents,
    ) -> Result<Self, StoreError> {
        for entry in contents.entries_mut() {
            for credential in &mut entry.credentials {
                credential.scope = scope.clone();
            }
        }
        let report = rewrap_stale(&mut contents, codec.as_ref());

        let store = Self {
            path,
            inner: InMemoryCredentialsStore::with_contents(scope, contents),
            codec,
            save_lock: Mutex::new(()),
            audit: AuditLogger::disabled(),
            report,
        };

        if report.rewrapped > 0 {
            info!(
                path = %store.path.display(),
                rewrapped = report.rewrapped,
                "re-encrypted stale secrets under current key epoch"
            );
            store.save()?;
        }
        Ok(store)
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub const fn load_report(&self) -> LoadReport {
        self.report
    }

    /// Re-encrypt every stale secret under the current key epoch and save.
    ///
    /// Used after a key rotation. Returns the refreshed report.
    pub fn rewrap(&self) -> Result<LoadReport, StoreError> {
        let report = self
            .inner
            .modify(|contents| Ok(rewrap_stale(contents, self.codec.as_ref())))?;
        if report.rewrapped > 0 {
            self.save()?;
        }
        Ok(report)
    }

    fn actor(&self) -> String {
        format!("store:{}", self.inner.scope())
    }
}

impl CredentialsStore for FileCredentialsStore {
    fn scope(&self) -> &Scope {
        self.inner.scope()
    }

    fn contents(&self) -> Arc<StoreContents> {
        self.inner.contents()
    }

    fn add_domain(&self, domain: Domain) -> Result<(), StoreError> {
        self.inner.add_domain(domain)
    }

    fn add(&self, domain: Option<&str>, credential: Credential) -> Result<(), StoreError> {
        let id = credential.id.clone();
        let credential_type = credential.credential_type();
        let result = self.inner.add(domain, credential);
        self.audit.record(
            AuditEventType::CredentialAdded,
            &self.actor(),
            Some(&id),
            result.is_ok(),
            Some(serde_json::json!({ "type": credential_type.as_str() })),
        );
        result
    }

    fn update(&self, id: &str, credential: Credential) -> Result<(), StoreError> {
        self.inner.update(id, credential)
    }

    fn remove(&self, id: &str) -> Result<Credential, StoreError> {
        let result = self.inner.remove(id);
        self.audit.record(
            AuditEventType::CredentialRemoved,
            &self.actor(),
            Some(id),
            result.is_ok(),
            None,
        );
        result
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn save(&self) -> Result<(), StoreError> {
        let _guard = self.save_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        // One consistent view; later writers publish a new Arc and do not
        // affect what is written here.
        let contents = self.inner.contents();
        let document = StoreDocument::new(self.inner.scope().clone(), &contents);
        let bytes = document.to_bytes()?;

        let result = write_atomically(&self.path, &bytes);
        self.audit.record(
            AuditEventType::StoreSaved,
            &self.actor(),
            None,
            result.is_ok(),
            Some(serde_json::json!({ "credentials": contents.len() })),
        );
        result?;
        debug!(credentials = contents.len(), "store saved");
        Ok(())
    }
}

impl std::fmt::Debug for FileCredentialsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCredentialsStore")
            .field("path", &self.path)
            .field("scope", self.inner.scope())
            .finish()
    }
}

fn read_document(path: &Path) -> Result<Option<StoreDocument>, StoreError> {
    match fs::read(path) {
        Ok(raw) => StoreDocument::parse(&raw).map(Some),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Rewrap stale secrets in place. Secrets that fail to decrypt are left
/// untouched and reported.
fn rewrap_stale(contents: &mut StoreContents, codec: &dyn SecretCodec) -> LoadReport {
    let mut report = LoadReport::default();
    for entry in contents.entries_mut() {
        for credential in &mut entry.credentials {
            report.credentials += 1;
            let id = credential.id.clone();
            for secret in credential.secrets_mut() {
                if !secret.is_stale(codec) {
                    continue;
                }
                match secret.rewrap(codec) {
                    Ok(fresh) => {
                        *secret = fresh;
                        report.rewrapped += 1;
                    }
                    Err(e) => {
                        report.unavailable += 1;
                        warn!(credential = %id, error = %e, "credential unavailable: secret cannot be decrypted");
                    }
                }
            }
        }
    }
    report
}

fn temp_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map_or_else(|| "store".into(), |n| n.to_string_lossy());
    format!(".{name}.")
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(io_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&temp_prefix(path))
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)
        .map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Remove temp files left behind by a save that never reached its rename.
fn sweep_temp_files(path: &Path) {
    let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return;
    };
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let prefix = temp_prefix(path);
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(TEMP_SUFFIX) {
            match fs::remove_file(entry.path()) {
                Ok(()) => debug!(file = %name, "removed leftover store temp file"),
                Err(e) => warn!(file = %name, error = %e, "failed to remove leftover store temp file"),
            }
        }
    }
}
