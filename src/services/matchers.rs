//! Composable credential predicates.
//!
//! ```ignore
//! let matcher = All(vec![Box::new(OfType(CredentialType::Certificate)), Box::new(WithId::new("myCert"))]);
//! let cert = first_or_none(registry.lookup(..), &matcher);
//! ```

use crate::domain::models::credential::{Credential, CredentialType};

/// A predicate over credentials.
pub trait CredentialsMatcher: Send + Sync {
    fn matches(&self, credential: &Credential) -> bool;
}

impl<F> CredentialsMatcher for F
where
    F: Fn(&Credential) -> bool + Send + Sync,
{
    fn matches(&self, credential: &Credential) -> bool {
        self(credential)
    }
}

/// Matches a credential by exact id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithId(pub String);

impl WithId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl CredentialsMatcher for WithId {
    fn matches(&self, credential: &Credential) -> bool {
        credential.id == self.0
    }
}

/// Matches credentials providing a capability; `Any` matches everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfType(pub CredentialType);

impl CredentialsMatcher for OfType {
    fn matches(&self, credential: &Credential) -> bool {
        credential.satisfies(self.0)
    }
}

/// Conjunction. Empty matches everything.
pub struct All(pub Vec<Box<dyn CredentialsMatcher>>);

impl CredentialsMatcher for All {
    fn matches(&self, credential: &Credential) -> bool {
        self.0.iter().all(|m| m.matches(credential))
    }
}

/// Disjunction. Empty matches nothing.
pub struct Any(pub Vec<Box<dyn CredentialsMatcher>>);

impl CredentialsMatcher for Any {
    fn matches(&self, credential: &Credential) -> bool {
        self.0.iter().any(|m| m.matches(credential))
    }
}

pub struct Not(pub Box<dyn CredentialsMatcher>);

impl CredentialsMatcher for Not {
    fn matches(&self, credential: &Credential) -> bool {
        !self.0.matches(credential)
    }
}

/// First credential, in iteration order, accepted by `matcher`.
pub fn first_or_none<I>(credentials: I, matcher: &dyn CredentialsMatcher) -> Option<Credential>
where
    I: IntoIterator<Item = Credential>,
{
    credentials.into_iter().find(|c| matcher.matches(c))
}

/// Every credential accepted by `matcher`, order preserved.
pub fn filter<I>(credentials: I, matcher: &dyn CredentialsMatcher) -> Vec<Credential>
where
    I: IntoIterator<Item = Credential>,
{
    credentials
        .into_iter()
        .filter(|c| matcher.matches(c))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::keystore::{KeyStoreFormat, KeyStoreSource};
    use crate::domain::models::secret::{PlaintextBytes, SecretBytes};
    use crate::infrastructure::crypto::AesGcmCodec;

    fn fixtures() -> Vec<Credential> {
        let codec = AesGcmCodec::ephemeral();
        let pw = SecretBytes::seal(&codec, &PlaintextBytes::from("pw")).unwrap();
        vec![
            Credential::username_password(Some("deploy"), "", "ci", pw.clone()),
            Credential::certificate(
                Some("signing"),
                "",
                pw.clone(),
                KeyStoreSource::on_disk("/certs/signing.p12", KeyStoreFormat::Pkcs12),
            ),
            Credential::certificate(
                Some("tls"),
                "",
                pw,
                KeyStoreSource::on_disk("/certs/tls.p12", KeyStoreFormat::Pkcs12),
            ),
        ]
    }

    fn ids(credentials: &[Credential]) -> Vec<&str> {
        credentials.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_first_or_none_respects_order() {
        let found = first_or_none(fixtures(), &OfType(CredentialType::Certificate)).unwrap();
        assert_eq!(found.id, "signing");
        assert!(first_or_none(fixtures(), &WithId::new("missing")).is_none());
    }

    #[test]
    fn test_combinators() {
        let certs_but_tls = All(vec![
            Box::new(OfType(CredentialType::Certificate)),
            Box::new(Not(Box::new(WithId::new("tls")))),
        ]);
        assert_eq!(ids(&filter(fixtures(), &certs_but_tls)), vec!["signing"]);

        let either = Any(vec![Box::new(WithId::new("tls")), Box::new(WithId::new("deploy"))]);
        assert_eq!(ids(&filter(fixtures(), &either)), vec!["deploy", "tls"]);

        assert_eq!(filter(fixtures(), &All(vec![])).len(), 3);
        assert!(filter(fixtures(), &Any(vec![])).is_empty());
    }

    #[test]
    fn test_closures_are_matchers() {
        let matcher = |c: &Credential| c.id.starts_with('s');
        assert_eq!(ids(&filter(fixtures(), &matcher)), vec!["signing"]);
    }
}
