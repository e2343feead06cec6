//! Credential domain model.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::errors::DecryptError;
use crate::domain::models::keystore::{KeyStoreFormat, KeyStoreSource};
use crate::domain::models::secret::SecretBytes;
use crate::domain::ports::SecretCodec;

/// Owner of a credential store: the whole controller, a folder, or a single
/// item (job). Paths are `/`-separated full names such as `team/infra/deploy`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Global,
    Folder(String),
    Item(String),
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Folder(_) => "folder",
            Self::Item(_) => "item",
        }
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Folder(path) | Self::Item(path) => Some(path),
        }
    }

    /// Stable tag used by the wire envelope.
    pub const fn wire_tag(&self) -> u8 {
        match self {
            Self::Global => 0,
            Self::Folder(_) => 1,
            Self::Item(_) => 2,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Folder(path) => write!(f, "folder:{path}"),
            Self::Item(path) => write!(f, "item:{path}"),
        }
    }
}

/// Ordered ancestry of containers used to decide which stores take part in a
/// lookup, from the root down to the target.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScopeChain(Vec<Scope>);

impl ScopeChain {
    /// Only the global scope, e.g. a lookup made by the controller itself.
    pub fn global() -> Self {
        Self(vec![Scope::Global])
    }

    /// Chain for an item: global, every ancestor folder, then the item.
    ///
    /// `team/infra/deploy` yields `Global, Folder(team), Folder(team/infra),
    /// Item(team/infra/deploy)`.
    pub fn for_item(full_name: &str) -> Self {
        let segments: Vec<&str> = full_name.split('/').filter(|s| !s.is_empty()).collect();
        let mut chain = vec![Scope::Global];
        if segments.is_empty() {
            return Self(chain);
        }
        for depth in 1..segments.len() {
            chain.push(Scope::Folder(segments[..depth].join("/")));
        }
        chain.push(Scope::Item(segments.join("/")));
        Self(chain)
    }

    /// Chain for a folder: global then every folder down to `full_name`.
    pub fn for_folder(full_name: &str) -> Self {
        let segments: Vec<&str> = full_name.split('/').filter(|s| !s.is_empty()).collect();
        let mut chain = vec![Scope::Global];
        for depth in 1..=segments.len() {
            chain.push(Scope::Folder(segments[..depth].join("/")));
        }
        Self(chain)
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.0
    }
}

/// Capability filter for lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    /// Any standard credential.
    #[default]
    Any,
    Certificate,
    UsernamePassword,
}

impl CredentialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Certificate => "certificate",
            Self::UsernamePassword => "username_password",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "any" | "standard" => Some(Self::Any),
            "certificate" | "cert" => Some(Self::Certificate),
            "username_password" | "usernamepassword" => Some(Self::UsernamePassword),
            _ => None,
        }
    }
}

/// A certificate held in a keystore, protected by a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateCredential {
    pub password: SecretBytes,
    pub key_store_source: KeyStoreSource,
}

/// A username with its password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernamePasswordCredential {
    pub username: String,
    pub password: SecretBytes,
}

/// Type-specific payload of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialKind {
    Certificate(CertificateCredential),
    UsernamePassword(UsernamePasswordCredential),
}

impl CredentialKind {
    pub const fn credential_type(&self) -> CredentialType {
        match self {
            Self::Certificate(_) => CredentialType::Certificate,
            Self::UsernamePassword(_) => CredentialType::UsernamePassword,
        }
    }

    /// Stable tag used by the wire envelope.
    pub const fn wire_tag(&self) -> u8 {
        match self {
            Self::Certificate(_) => 1,
            Self::UsernamePassword(_) => 2,
        }
    }
}

/// A stored credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Unique within its owning store
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Owning scope; overwritten by the store a credential is added to
    #[serde(default)]
    pub scope: Scope,
    #[serde(flatten)]
    pub kind: CredentialKind,
}

impl Credential {
    /// A certificate credential. A missing or blank id gets a random UUID.
    pub fn certificate(
        id: Option<&str>,
        description: impl Into<String>,
        password: SecretBytes,
        key_store_source: KeyStoreSource,
    ) -> Self {
        Self {
            id: resolve_id(id),
            description: description.into(),
            scope: Scope::Global,
            kind: CredentialKind::Certificate(CertificateCredential {
                password,
                key_store_source,
            }),
        }
    }

    /// A username/password credential. A missing or blank id gets a random UUID.
    pub fn username_password(
        id: Option<&str>,
        description: impl Into<String>,
        username: impl Into<String>,
        password: SecretBytes,
    ) -> Self {
        Self {
            id: resolve_id(id),
            description: description.into(),
            scope: Scope::Global,
            kind: CredentialKind::UsernamePassword(UsernamePasswordCredential {
                username: username.into(),
                password,
            }),
        }
    }

    pub const fn credential_type(&self) -> CredentialType {
        self.kind.credential_type()
    }

    /// Whether this credential provides the requested capability.
    pub fn satisfies(&self, wanted: CredentialType) -> bool {
        wanted == CredentialType::Any || wanted == self.credential_type()
    }

    pub const fn as_certificate(&self) -> Option<&CertificateCredential> {
        match &self.kind {
            CredentialKind::Certificate(cert) => Some(cert),
            CredentialKind::UsernamePassword(_) => None,
        }
    }

    pub const fn password(&self) -> &SecretBytes {
        match &self.kind {
            CredentialKind::Certificate(cert) => &cert.password,
            CredentialKind::UsernamePassword(up) => &up.password,
        }
    }

    pub fn decrypt_password(
        &self,
        codec: &dyn SecretCodec,
    ) -> Result<zeroize::Zeroizing<String>, DecryptError> {
        self.password().decrypt_utf8(codec)
    }

    pub fn keystore_format(&self) -> Option<KeyStoreFormat> {
        self.as_certificate()
            .map(|cert| cert.key_store_source.keystore_format())
    }

    /// Every encrypted field, for maintenance passes such as re-wrapping.
    pub fn secrets_mut(&mut self) -> Vec<&mut SecretBytes> {
        match &mut self.kind {
            CredentialKind::Certificate(cert) => {
                let mut secrets = vec![&mut cert.password];
                match &mut cert.key_store_source {
                    KeyStoreSource::Uploaded { keystore, .. } => secrets.push(keystore),
                    KeyStoreSource::OnAgentDisk { .. } => {}
                }
                secrets
            }
            CredentialKind::UsernamePassword(up) => vec![&mut up.password],
        }
    }

    pub fn secrets(&self) -> Vec<&SecretBytes> {
        match &self.kind {
            CredentialKind::Certificate(cert) => {
                let mut secrets = vec![&cert.password];
                match &cert.key_store_source {
                    KeyStoreSource::Uploaded { keystore, .. } => secrets.push(keystore),
                    KeyStoreSource::OnAgentDisk { .. } => {}
                }
                secrets
            }
            CredentialKind::UsernamePassword(up) => vec![&up.password],
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ({})",
            self.id,
            self.credential_type().as_str(),
            self.scope
        )?;
        if !self.description.is_empty() {
            write!(f, " - {}", self.description)?;
        }
        Ok(())
    }
}

fn resolve_id(id: Option<&str>) -> String {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::secret::PlaintextBytes;
    use crate::infrastructure::crypto::AesGcmCodec;

    #[test]
    fn test_scope_chain_for_item() {
        let chain = ScopeChain::for_item("team/infra/deploy");
        assert_eq!(
            chain.scopes(),
            &[
                Scope::Global,
                Scope::Folder("team".to_string()),
                Scope::Folder("team/infra".to_string()),
                Scope::Item("team/infra/deploy".to_string()),
            ]
        );
        assert!(chain.contains(&Scope::Folder("team".to_string())));
        assert!(!chain.contains(&Scope::Folder("other".to_string())));
    }

    #[test]
    fn test_scope_chain_for_top_level_item_and_folder() {
        assert_eq!(
            ScopeChain::for_item("proj").scopes(),
            &[Scope::Global, Scope::Item("proj".to_string())]
        );
        assert_eq!(ScopeChain::for_item("").scopes(), &[Scope::Global]);
        assert_eq!(
            ScopeChain::for_folder("a/b").scopes(),
            &[
                Scope::Global,
                Scope::Folder("a".to_string()),
                Scope::Folder("a/b".to_string())
            ]
        );
    }

    #[test]
    fn test_missing_id_is_generated() {
        let codec = AesGcmCodec::ephemeral();
        let password = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        let cred = Credential::username_password(None, "", "bob", password.clone());
        assert!(Uuid::parse_str(&cred.id).is_ok());

        let blank = Credential::username_password(Some("  "), "", "bob", password);
        assert!(Uuid::parse_str(&blank.id).is_ok());
    }

    #[test]
    fn test_type_filter() {
        let codec = AesGcmCodec::ephemeral();
        let password = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        let cred = Credential::username_password(Some("svc"), "", "bob", password);

        assert!(cred.satisfies(CredentialType::Any));
        assert!(cred.satisfies(CredentialType::UsernamePassword));
        assert!(!cred.satisfies(CredentialType::Certificate));
        assert_eq!(cred.decrypt_password(&codec).unwrap().as_str(), "pw");
        assert!(cred.as_certificate().is_none());
    }

    #[test]
    fn test_credential_serialization_shape() {
        let codec = AesGcmCodec::ephemeral();
        let password = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        let cred = Credential::certificate(
            Some("myCert"),
            "test cert",
            password,
            KeyStoreSource::on_disk("/tmp/x.p12", KeyStoreFormat::Pkcs12),
        );

        let json = serde_json::to_value(&cred).unwrap();
        assert_eq!(json["id"], "myCert");
        assert_eq!(json["type"], "certificate");
        assert_eq!(json["scope"]["kind"], "global");
        assert_eq!(json["key_store_source"]["kind"], "on_agent_disk");
        assert!(json["password"].is_string());

        let back: Credential = serde_json::from_value(json).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn test_credential_type_names() {
        assert_eq!(
            CredentialType::from_str("username-password"),
            Some(CredentialType::UsernamePassword)
        );
        assert_eq!(CredentialType::from_str("cert"), Some(CredentialType::Certificate));
        assert_eq!(CredentialType::from_str("ssh"), None);
    }
}
