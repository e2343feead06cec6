//! Credentials store port.

use std::sync::Arc;

use crate::domain::errors::StoreError;
use crate::domain::models::credential::{Credential, CredentialType, Scope};
use crate::domain::models::credential_domain::{Domain, RequirementSet};
use crate::domain::models::store_contents::StoreContents;

/// An ordered collection of credentials owned by one scope.
///
/// Readers get a consistent point-in-time view through [`contents`]; a
/// mutation replaces the whole view, so no reader ever observes half of one.
///
/// [`contents`]: CredentialsStore::contents
pub trait CredentialsStore: Send + Sync {
    /// Scope that owns this store.
    fn scope(&self) -> &Scope;

    /// Current contents.
    fn contents(&self) -> Arc<StoreContents>;

    /// Add a domain. Fails if a domain with the same name exists.
    fn add_domain(&self, domain: Domain) -> Result<(), StoreError>;

    /// Add a credential to the named domain (`None` = global domain).
    fn add(&self, domain: Option<&str>, credential: Credential) -> Result<(), StoreError>;

    /// Replace the credential with the given id, keeping its position.
    fn update(&self, id: &str, credential: Credential) -> Result<(), StoreError>;

    /// Remove the first credential with the given id.
    fn remove(&self, id: &str) -> Result<Credential, StoreError>;

    /// Make the current contents durable.
    fn save(&self) -> Result<(), StoreError>;

    fn domains(&self) -> Vec<Domain> {
        self.contents().domains()
    }

    /// Every credential, in domain order then insertion order.
    fn list(&self) -> Vec<Credential> {
        self.contents().list()
    }

    fn list_in_domain(&self, domain: Option<&str>) -> Result<Vec<Credential>, StoreError> {
        self.contents().list_in_domain(domain)
    }

    /// Credentials whose domain matches the requirements, in order.
    fn credentials_for(&self, requirements: &RequirementSet) -> Vec<Credential> {
        self.contents().credentials_for(requirements)
    }

    /// First credential with this id that provides the wanted capability.
    fn find_by_id(&self, id: &str, wanted: CredentialType) -> Option<Credential> {
        self.contents().find_by_id(id, wanted)
    }
}
