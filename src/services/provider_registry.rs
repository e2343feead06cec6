//! Registry of credential stores consulted by lookups.
//!
//! The [`CredentialsProviderRegistry`] holds an explicit, ordered list of
//! stores assembled at startup. A lookup walks the stores whose scope is on
//! the caller's [`ScopeChain`] in registration order, then each store's
//! domains in order, then credentials in insertion order. Nearer scopes get
//! no priority: when two stores hold the same id, the one registered first
//! wins.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::errors::LookupError;
use crate::domain::models::credential::{Credential, CredentialType, ScopeChain};
use crate::domain::models::credential_domain::RequirementSet;
use crate::domain::ports::CredentialsStore;
use crate::services::matchers::CredentialsMatcher;

/// Stateless aggregator over registered stores. Cheap to clone.
#[derive(Clone, Default)]
pub struct CredentialsProviderRegistry {
    stores: Vec<Arc<dyn CredentialsStore>>,
}

impl std::fmt::Debug for CredentialsProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsProviderRegistry")
            .field(
                "stores",
                &self
                    .stores
                    .iter()
                    .map(|s| s.scope().to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builder for [`CredentialsProviderRegistry`]. Registration order is
/// lookup order.
#[derive(Default)]
pub struct RegistryBuilder {
    stores: Vec<Arc<dyn CredentialsStore>>,
}

impl RegistryBuilder {
    #[must_use]
    pub fn register(mut self, store: Arc<dyn CredentialsStore>) -> Self {
        self.stores.push(store);
        self
    }

    #[must_use]
    pub fn register_all(mut self, stores: impl IntoIterator<Item = Arc<dyn CredentialsStore>>) -> Self {
        self.stores.extend(stores);
        self
    }

    pub fn build(self) -> CredentialsProviderRegistry {
        CredentialsProviderRegistry {
            stores: self.stores,
        }
    }
}

impl CredentialsProviderRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn stores(&self) -> &[Arc<dyn CredentialsStore>] {
        &self.stores
    }

    pub fn len(&self) -> usize {
        self.stores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stores.is_empty()
    }

    /// Registered stores whose scope is on `chain`, in registration order.
    pub fn stores_for<'a>(
        &'a self,
        chain: &'a ScopeChain,
    ) -> impl Iterator<Item = &'a Arc<dyn CredentialsStore>> + 'a {
        self.stores
            .iter()
            .filter(move |store| chain.contains(store.scope()))
    }

    /// Every visible credential of type `wanted` whose domain matches
    /// `requirements`, optionally restricted to one id.
    ///
    /// A miss is an empty vector, never an error.
    #[instrument(skip_all, fields(credential_type = wanted.as_str(), id = ?id))]
    pub fn lookup(
        &self,
        wanted: CredentialType,
        chain: &ScopeChain,
        requirements: &RequirementSet,
        id: Option<&str>,
    ) -> Vec<Credential> {
        let found: Vec<Credential> = self
            .stores_for(chain)
            .flat_map(|store| store.credentials_for(requirements))
            .filter(|c| c.satisfies(wanted))
            .filter(|c| id.map_or(true, |id| c.id == id))
            .collect();
        debug!(matches = found.len(), "credential lookup");
        found
    }

    /// Like [`lookup`](Self::lookup) with an arbitrary matcher in place of
    /// the type and id filters.
    pub fn lookup_matching(
        &self,
        chain: &ScopeChain,
        requirements: &RequirementSet,
        matcher: &dyn CredentialsMatcher,
    ) -> Vec<Credential> {
        self.stores_for(chain)
            .flat_map(|store| store.credentials_for(requirements))
            .filter(|c| matcher.matches(c))
            .collect()
    }

    /// First credential [`lookup`](Self::lookup) would return.
    pub fn lookup_one(
        &self,
        wanted: CredentialType,
        chain: &ScopeChain,
        requirements: &RequirementSet,
        id: Option<&str>,
    ) -> Option<Credential> {
        self.stores_for(chain)
            .flat_map(|store| store.credentials_for(requirements))
            .find(|c| c.satisfies(wanted) && id.map_or(true, |id| c.id == id))
    }

    /// The credential with `id`, or [`LookupError::NotFound`].
    pub fn require(
        &self,
        wanted: CredentialType,
        chain: &ScopeChain,
        requirements: &RequirementSet,
        id: &str,
    ) -> Result<Credential, LookupError> {
        self.lookup_one(wanted, chain, requirements, Some(id))
            .ok_or_else(|| LookupError::NotFound { id: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCredentialsStore;
    use crate::domain::models::credential::Scope;
    use crate::domain::models::credential_domain::{Domain, DomainRequirement, DomainSpecification};
    use crate::domain::models::secret::{PlaintextBytes, SecretBytes};
    use crate::infrastructure::crypto::AesGcmCodec;
    use crate::services::matchers::WithId;

    fn user(codec: &AesGcmCodec, id: &str, username: &str) -> Credential {
        let pw = SecretBytes::seal(codec, &PlaintextBytes::from("pw")).unwrap();
        Credential::username_password(Some(id), "", username, pw)
    }

    fn username(credential: &Credential) -> &str {
        match &credential.kind {
            crate::domain::models::credential::CredentialKind::UsernamePassword(up) => &up.username,
            crate::domain::models::credential::CredentialKind::Certificate(_) => "",
        }
    }

    fn store(scope: Scope, credentials: Vec<Credential>) -> Arc<dyn CredentialsStore> {
        let store = InMemoryCredentialsStore::new(scope);
        for credential in credentials {
            store.add(None, credential).unwrap();
        }
        Arc::new(store)
    }

    #[test]
    fn test_lookup_walks_scope_chain_in_registration_order() {
        let codec = AesGcmCodec::ephemeral();
        let registry = CredentialsProviderRegistry::builder()
            .register(store(Scope::Global, vec![user(&codec, "shared", "global")]))
            .register(store(
                Scope::Folder("team".into()),
                vec![user(&codec, "shared", "team"), user(&codec, "team-only", "t")],
            ))
            .register(store(
                Scope::Folder("other".into()),
                vec![user(&codec, "other-only", "o")],
            ))
            .build();

        let chain = ScopeChain::for_item("team/deploy");
        let found = registry.lookup(CredentialType::Any, &chain, &RequirementSet::empty(), None);
        let ids: Vec<&str> = found.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["shared", "shared", "team-only"]);

        let one = registry
            .lookup_one(CredentialType::Any, &chain, &RequirementSet::empty(), Some("shared"))
            .unwrap();
        assert_eq!(username(&one), "global");
    }

    #[test]
    fn test_global_chain_sees_only_global_store() {
        let codec = AesGcmCodec::ephemeral();
        let registry = CredentialsProviderRegistry::builder()
            .register(store(Scope::Item("team/deploy".into()), vec![user(&codec, "a", "a")]))
            .build();
        assert!(registry
            .lookup(CredentialType::Any, &ScopeChain::global(), &RequirementSet::empty(), None)
            .is_empty());
    }

    #[test]
    fn test_type_and_domain_filters() {
        let codec = AesGcmCodec::ephemeral();
        let scoped = InMemoryCredentialsStore::new(Scope::Global);
        scoped
            .add_domain(Domain::named(
                "corp",
                vec![DomainSpecification::Hostname {
                    includes: "*.corp.example".into(),
                    excludes: String::new(),
                }],
            ))
            .unwrap();
        scoped.add(Some("corp"), user(&codec, "corp", "c")).unwrap();
        let registry = CredentialsProviderRegistry::builder()
            .register(Arc::new(scoped))
            .build();
        let chain = ScopeChain::global();

        let public = RequirementSet::empty().with(DomainRequirement::Hostname("example.org".into()));
        assert!(registry.lookup(CredentialType::Any, &chain, &public, None).is_empty());

        let corp = RequirementSet::from_uri("https://git.corp.example/repo.git");
        assert_eq!(registry.lookup(CredentialType::Any, &chain, &corp, None).len(), 1);
        assert!(registry
            .lookup(CredentialType::Certificate, &chain, &corp, None)
            .is_empty());
    }

    #[test]
    fn test_require_reports_missing_id() {
        let registry = CredentialsProviderRegistry::default();
        let err = registry
            .require(
                CredentialType::Any,
                &ScopeChain::global(),
                &RequirementSet::empty(),
                "nope",
            )
            .unwrap_err();
        assert_eq!(err, LookupError::NotFound { id: "nope".into() });
    }

    #[test]
    fn test_lookup_matching() {
        let codec = AesGcmCodec::ephemeral();
        let registry = CredentialsProviderRegistry::builder()
            .register(store(Scope::Global, vec![user(&codec, "a", "a"), user(&codec, "b", "b")]))
            .build();
        let found = registry.lookup_matching(
            &ScopeChain::global(),
            &RequirementSet::empty(),
            &WithId::new("b"),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "b");
    }
}
