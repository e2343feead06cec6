//! In-memory contents of one credential store.
//!
//! Stores never mutate a `StoreContents` that readers can see. They clone,
//! modify the clone and publish it, so every value of this type is a
//! complete, consistent state.

use serde::{Deserialize, Serialize};

use crate::domain::errors::StoreError;
use crate::domain::models::credential::{Credential, CredentialType};
use crate::domain::models::credential_domain::{Domain, RequirementSet};

/// A domain together with its credentials, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCredentials {
    pub domain: Domain,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl DomainCredentials {
    pub const fn new(domain: Domain) -> Self {
        Self {
            domain,
            credentials: Vec::new(),
        }
    }
}

/// Ordered domains of a store. The global domain always exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreContents {
    domains: Vec<DomainCredentials>,
}

impl Default for StoreContents {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreContents {
    /// Empty contents holding only the global domain.
    pub fn new() -> Self {
        Self {
            domains: vec![DomainCredentials::new(Domain::global())],
        }
    }

    /// Rebuild contents from persisted entries, adding the global domain
    /// first if the entries lack one.
    pub fn from_entries(mut entries: Vec<DomainCredentials>) -> Self {
        if !entries.iter().any(|entry| entry.domain.is_global()) {
            entries.insert(0, DomainCredentials::new(Domain::global()));
        }
        Self { domains: entries }
    }

    pub fn entries(&self) -> &[DomainCredentials] {
        &self.domains
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [DomainCredentials] {
        &mut self.domains
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.domains.iter().map(|entry| entry.domain.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.domains.iter().map(|entry| entry.credentials.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn list(&self) -> Vec<Credential> {
        self.iter().cloned().collect()
    }

    /// Every credential in domain order, then insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.domains.iter().flat_map(|entry| entry.credentials.iter())
    }

    pub fn list_in_domain(&self, name: Option<&str>) -> Result<Vec<Credential>, StoreError> {
        self.entry(name)
            .map(|entry| entry.credentials.clone())
            .ok_or_else(|| StoreError::DomainNotFound(domain_label(name)))
    }

    pub fn credentials_for(&self, requirements: &RequirementSet) -> Vec<Credential> {
        self.domains
            .iter()
            .filter(|entry| entry.domain.matches(requirements))
            .flat_map(|entry| entry.credentials.iter().cloned())
            .collect()
    }

    /// First credential with `id` providing `wanted`; duplicates resolve to
    /// the earliest in domain then insertion order.
    pub fn find_by_id(&self, id: &str, wanted: CredentialType) -> Option<Credential> {
        self.iter()
            .find(|credential| credential.id == id && credential.satisfies(wanted))
            .cloned()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.iter().any(|credential| credential.id == id)
    }

    pub fn add_domain(&mut self, domain: Domain) -> Result<(), StoreError> {
        if self
            .domains
            .iter()
            .any(|entry| entry.domain.name == domain.name)
        {
            return Err(StoreError::DuplicateDomain(
                domain.display_name().to_string(),
            ));
        }
        self.domains.push(DomainCredentials::new(domain));
        Ok(())
    }

    pub fn add(&mut self, name: Option<&str>, credential: Credential) -> Result<(), StoreError> {
        if credential.id.trim().is_empty() {
            return Err(StoreError::InvalidCredential(
                "credential id must not be blank".to_string(),
            ));
        }
        if self.contains_id(&credential.id) {
            return Err(StoreError::DuplicateId(credential.id));
        }
        let entry = self
            .entry_mut(name)
            .ok_or_else(|| StoreError::DomainNotFound(domain_label(name)))?;
        entry.credentials.push(credential);
        Ok(())
    }

    /// Replace the first credential with `id` in place.
    pub fn update(&mut self, id: &str, credential: Credential) -> Result<(), StoreError> {
        if credential.id != id && self.contains_id(&credential.id) {
            return Err(StoreError::DuplicateId(credential.id));
        }
        let slot = self
            .domains
            .iter_mut()
            .flat_map(|entry| entry.credentials.iter_mut())
            .find(|existing| existing.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = credential;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Credential, StoreError> {
        for entry in &mut self.domains {
            if let Some(index) = entry.credentials.iter().position(|c| c.id == id) {
                return Ok(entry.credentials.remove(index));
            }
        }
        Err(StoreError::NotFound(id.to_string()))
    }

    fn entry(&self, name: Option<&str>) -> Option<&DomainCredentials> {
        self.domains.iter().find(|entry| addresses(&entry.domain, name))
    }

    fn entry_mut(&mut self, name: Option<&str>) -> Option<&mut DomainCredentials> {
        self.domains
            .iter_mut()
            .find(|entry| addresses(&entry.domain, name))
    }
}

/// `None` addresses the global domain, never an unnamed restricted one.
fn addresses(domain: &Domain, name: Option<&str>) -> bool {
    match name {
        Some(name) => domain.name.as_deref() == Some(name),
        None => domain.is_global(),
    }
}

fn domain_label(name: Option<&str>) -> String {
    name.unwrap_or("(global)").to_string()
}
