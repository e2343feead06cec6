//! Detached credentials: by-value copies safe to move across a process
//! boundary.

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::domain::errors::{DecryptError, KeyStoreError};
use crate::domain::models::credential::{Credential, CredentialKind, CredentialType, Scope};
use crate::domain::models::keystore::{KeyStoreFormat, KeyStoreSource};
use crate::domain::models::secret::PlaintextBytes;
use crate::domain::ports::SecretCodec;

/// A credential whose every keystore source is `Uploaded`.
///
/// Holds no path, store or scope handle that only exists in the process that
/// produced it. Only the snapshot engine and the wire decoder construct it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Credential", into = "Credential")]
pub struct DetachedCredential(Credential);

impl DetachedCredential {
    /// Wrap a credential that is already self-contained.
    ///
    /// Returns the credential back when it still references an on-disk
    /// keystore.
    pub(crate) fn try_new(credential: Credential) -> Result<Self, Credential> {
        if is_self_contained(&credential) {
            Ok(Self(credential))
        } else {
            Err(credential)
        }
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn description(&self) -> &str {
        &self.0.description
    }

    pub const fn scope(&self) -> &Scope {
        &self.0.scope
    }

    pub const fn credential_type(&self) -> CredentialType {
        self.0.credential_type()
    }

    /// Borrow as a regular credential, e.g. to hand to code written
    /// against `Credential`.
    pub const fn credential(&self) -> &Credential {
        &self.0
    }

    pub fn into_credential(self) -> Credential {
        self.0
    }

    /// Decrypt the embedded keystore. `None` for non-certificate kinds.
    pub fn keystore_bytes(
        &self,
        codec: &dyn SecretCodec,
    ) -> Option<Result<PlaintextBytes, KeyStoreError>> {
        self.0
            .as_certificate()
            .map(|cert| cert.key_store_source.keystore_bytes(codec))
    }

    pub fn keystore_format(&self) -> Option<KeyStoreFormat> {
        self.0.keystore_format()
    }

    pub fn password(&self, codec: &dyn SecretCodec) -> Result<Zeroizing<String>, DecryptError> {
        self.0.decrypt_password(codec)
    }
}

impl TryFrom<Credential> for DetachedCredential {
    type Error = String;

    fn try_from(credential: Credential) -> Result<Self, Self::Error> {
        Self::try_new(credential).map_err(|c| {
            format!(
                "credential '{}' references an on-disk keystore and is not detached",
                c.id
            )
        })
    }
}

impl From<DetachedCredential> for Credential {
    fn from(detached: DetachedCredential) -> Self {
        detached.0
    }
}

fn is_self_contained(credential: &Credential) -> bool {
    match &credential.kind {
        CredentialKind::Certificate(cert) => match cert.key_store_source {
            KeyStoreSource::Uploaded { .. } => true,
            KeyStoreSource::OnAgentDisk { .. } => false,
        },
        CredentialKind::UsernamePassword(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::secret::SecretBytes;
    use crate::infrastructure::crypto::AesGcmCodec;

    #[test]
    fn test_on_disk_certificate_is_not_detached() {
        let codec = AesGcmCodec::ephemeral();
        let password = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        let cred = Credential::certificate(
            Some("disk"),
            "",
            password,
            KeyStoreSource::on_disk("/nope.p12", KeyStoreFormat::Pkcs12),
        );
        assert!(DetachedCredential::try_new(cred).is_err());
    }

    #[test]
    fn test_deserialize_rejects_on_disk_source() {
        let codec = AesGcmCodec::ephemeral();
        let password = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        let cred = Credential::certificate(
            Some("disk"),
            "",
            password,
            KeyStoreSource::on_disk("/nope.p12", KeyStoreFormat::Pkcs12),
        );
        let json = serde_json::to_string(&cred).unwrap();
        assert!(serde_json::from_str::<DetachedCredential>(&json).is_err());
    }

    #[test]
    fn test_username_password_is_always_self_contained() {
        let codec = AesGcmCodec::ephemeral();
        let password = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        let cred = Credential::username_password(Some("svc"), "", "bob", password);
        let detached = DetachedCredential::try_new(cred).unwrap();
        assert!(detached.keystore_bytes(&codec).is_none());
        assert_eq!(detached.password(&codec).unwrap().as_str(), "pw");
    }
}
