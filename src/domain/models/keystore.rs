//! Keystore sources for certificate credentials.
//!
//! The set of sources is closed. Adding a variant forces an update of the
//! snapshot resolver, which matches on it exhaustively.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::errors::{EncryptError, KeyStoreError};
use crate::domain::models::secret::{PlaintextBytes, SecretBytes};
use crate::domain::ports::SecretCodec;

/// Container format of a keystore blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KeyStoreFormat {
    #[default]
    Pkcs12,
    Jks,
    Jceks,
}

impl KeyStoreFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pkcs12 => "PKCS12",
            Self::Jks => "JKS",
            Self::Jceks => "JCEKS",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pkcs12" | "p12" | "pfx" => Some(Self::Pkcs12),
            "jks" => Some(Self::Jks),
            "jceks" => Some(Self::Jceks),
            _ => None,
        }
    }

    /// Stable tag used by the wire envelope.
    pub const fn wire_tag(self) -> u8 {
        match self {
            Self::Pkcs12 => 1,
            Self::Jks => 2,
            Self::Jceks => 3,
        }
    }

    pub const fn from_wire_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Pkcs12),
            2 => Some(Self::Jks),
            3 => Some(Self::Jceks),
            _ => None,
        }
    }

    /// File extension used when the keystore is written to disk.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pkcs12 => "p12",
            Self::Jks => "jks",
            Self::Jceks => "jceks",
        }
    }

    /// Guess the format from the leading bytes of a keystore.
    ///
    /// PKCS#12 is a DER SEQUENCE; JKS and JCEKS carry fixed magic numbers.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFE, 0xED, 0xFE, 0xED, ..] => Some(Self::Jks),
            [0xCE, 0xCE, 0xCE, 0xCE, ..] => Some(Self::Jceks),
            [0x30, 0x80..=0x84, ..] => Some(Self::Pkcs12),
            _ => None,
        }
    }
}

/// Where a certificate credential gets its keystore bytes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyStoreSource {
    /// Keystore bytes uploaded into the store, encrypted at rest.
    Uploaded {
        keystore: SecretBytes,
        #[serde(default)]
        format: KeyStoreFormat,
    },
    /// A keystore file that exists on the machine holding the credential.
    /// Only meaningful in the process that created it.
    OnAgentDisk {
        path: PathBuf,
        #[serde(default)]
        format: KeyStoreFormat,
    },
}

impl KeyStoreSource {
    /// Encrypt raw keystore bytes into an `Uploaded` source.
    pub fn upload(
        codec: &dyn SecretCodec,
        bytes: &PlaintextBytes,
        format: KeyStoreFormat,
    ) -> Result<Self, EncryptError> {
        if let Some(detected) = KeyStoreFormat::detect(bytes.as_bytes()) {
            if detected != format {
                tracing::warn!(
                    declared = format.as_str(),
                    detected = detected.as_str(),
                    "uploaded keystore does not look like its declared format"
                );
            }
        }
        Ok(Self::Uploaded {
            keystore: SecretBytes::seal(codec, bytes)?,
            format,
        })
    }

    pub fn on_disk(path: impl Into<PathBuf>, format: KeyStoreFormat) -> Self {
        Self::OnAgentDisk {
            path: path.into(),
            format,
        }
    }

    /// Resolve the raw keystore bytes.
    ///
    /// `Uploaded` decrypts on every call; `OnAgentDisk` reads the file at
    /// call time. Neither caches plaintext.
    pub fn keystore_bytes(&self, codec: &dyn SecretCodec) -> Result<PlaintextBytes, KeyStoreError> {
        match self {
            Self::Uploaded { keystore, .. } => Ok(keystore.decrypt(codec)?),
            Self::OnAgentDisk { path, .. } => {
                let bytes = std::fs::read(path).map_err(|source| KeyStoreError::Unreadable {
                    path: path.clone(),
                    source,
                })?;
                if bytes.is_empty() {
                    return Err(KeyStoreError::Empty(path.clone()));
                }
                Ok(PlaintextBytes::new(bytes))
            }
        }
    }

    pub const fn keystore_format(&self) -> KeyStoreFormat {
        match self {
            Self::Uploaded { format, .. } | Self::OnAgentDisk { format, .. } => *format,
        }
    }

    /// Whether the source carries its bytes by value and can cross a
    /// process boundary as-is.
    pub const fn is_snapshot_safe(&self) -> bool {
        matches!(self, Self::Uploaded { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Uploaded { .. } => "uploaded",
            Self::OnAgentDisk { .. } => "on_agent_disk",
        }
    }
}
