//! Binding a certificate credential into a build workspace.
//!
//! Works from a [`DetachedCredential`] alone, the same way it would on a
//! remote agent that received one. The keystore is written to a private
//! file under `<workspace>/<secrets_dir_name>/` that lives exactly as long
//! as the returned [`BoundCertificate`].

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, instrument};
use zeroize::Zeroizing;

use crate::domain::errors::BindingError;
use crate::domain::models::config::BindingConfig;
use crate::domain::models::keystore::KeyStoreFormat;
use crate::domain::models::snapshot::DetachedCredential;
use crate::domain::ports::SecretCodec;
use crate::infrastructure::logging::{AuditEventType, AuditLogger};

/// Names of the environment variables a bound certificate is exposed as.
#[derive(Debug, Clone)]
pub struct CertificateBinding {
    pub keystore_variable: String,
    pub password_variable: String,
    audit: AuditLogger,
}

impl CertificateBinding {
    pub fn new(keystore_variable: impl Into<String>, password_variable: impl Into<String>) -> Self {
        Self {
            keystore_variable: keystore_variable.into(),
            password_variable: password_variable.into(),
            audit: AuditLogger::disabled(),
        }
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    #[instrument(skip_all, fields(id = %credential.id(), workspace = %workspace.display()))]
    pub fn bind(
        &self,
        credential: &DetachedCredential,
        workspace: &Path,
        codec: &dyn SecretCodec,
        config: &BindingConfig,
    ) -> Result<BoundCertificate, BindingError> {
        let result = self.write_keystore(credential, workspace, codec, config);
        self.audit.record(
            AuditEventType::CredentialBound,
            "binding",
            Some(credential.id()),
            result.is_ok(),
            Some(serde_json::json!({ "keystore_variable": self.keystore_variable })),
        );
        result
    }

    fn write_keystore(
        &self,
        credential: &DetachedCredential,
        workspace: &Path,
        codec: &dyn SecretCodec,
        config: &BindingConfig,
    ) -> Result<BoundCertificate, BindingError> {
        let (format, keystore) = match (credential.keystore_format(), credential.keystore_bytes(codec)) {
            (Some(format), Some(bytes)) => (format, bytes?),
            _ => return Err(BindingError::NotACertificate(credential.id().to_string())),
        };
        let password = credential.password(codec)?;

        let secrets_dir = workspace.join(&config.secrets_dir_name);
        fs::create_dir_all(&secrets_dir)?;

        let suffix = format!(".{}", format.extension());
        let mut builder = tempfile::Builder::new();
        builder.prefix("keystore-").suffix(&suffix);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o600));
        }
        let mut file = builder.tempfile_in(&secrets_dir)?;
        file.write_all(keystore.as_bytes())?;
        file.as_file().sync_all()?;
        let keystore_path = file.into_temp_path();

        debug!(path = %keystore_path.display(), "bound keystore into workspace");
        Ok(BoundCertificate {
            keystore_path,
            format,
            password,
            keystore_variable: self.keystore_variable.clone(),
            password_variable: self.password_variable.clone(),
        })
    }
}

/// A keystore materialized in a workspace. Dropping it deletes the file.
pub struct BoundCertificate {
    keystore_path: TempPath,
    format: KeyStoreFormat,
    password: Zeroizing<String>,
    keystore_variable: String,
    password_variable: String,
}

impl BoundCertificate {
    pub fn keystore_path(&self) -> &Path {
        &self.keystore_path
    }

    pub const fn format(&self) -> KeyStoreFormat {
        self.format
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Variables to set for the build step: keystore path and password.
    pub fn environment(&self) -> Vec<(String, Zeroizing<String>)> {
        vec![
            (
                self.keystore_variable.clone(),
                Zeroizing::new(self.keystore_path.display().to_string()),
            ),
            (self.password_variable.clone(), self.password.clone()),
        ]
    }

    /// Delete the keystore now, reporting failure instead of ignoring it.
    pub fn unbind(self) -> std::io::Result<()> {
        self.keystore_path.close()
    }
}

impl fmt::Debug for BoundCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCertificate")
            .field("keystore_path", &self.keystore_path.display())
            .field("format", &self.format)
            .field("keystore_variable", &self.keystore_variable)
            .field("password_variable", &self.password_variable)
            .finish_non_exhaustive()
    }
}
