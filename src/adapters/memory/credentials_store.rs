//! In-memory implementation of CredentialsStore.
//!
//! Holds the current contents behind `RwLock<Arc<_>>`. Readers clone the
//! `Arc` and never block on each other; a writer builds the next state from
//! a copy and swaps it in whole.

use std::sync::{Arc, RwLock};

use crate::domain::errors::StoreError;
use crate::domain::models::credential::{Credential, Scope};
use crate::domain::models::credential_domain::Domain;
use crate::domain::models::store_contents::StoreContents;
use crate::domain::ports::CredentialsStore;

pub struct InMemoryCredentialsStore {
    scope: Scope,
    contents: RwLock<Arc<StoreContents>>,
}

impl InMemoryCredentialsStore {
    pub fn new(scope: Scope) -> Self {
        Self::with_contents(scope, StoreContents::new())
    }

    pub fn with_contents(scope: Scope, contents: StoreContents) -> Self {
        Self {
            scope,
            contents: RwLock::new(Arc::new(contents)),
        }
    }

    /// Apply `change` to a copy of the contents and publish the copy.
    ///
    /// Nothing is published when `change` fails.
    pub(crate) fn modify<T>(
        &self,
        change: impl FnOnce(&mut StoreContents) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut current = self.contents.write().map_err(|_| StoreError::LockPoisoned)?;
        let mut next = StoreContents::clone(&current);
        let value = change(&mut next)?;
        *current = Arc::new(next);
        Ok(value)
    }

    fn owned(&self, mut credential: Credential) -> Credential {
        credential.scope = self.scope.clone();
        credential
    }
}

impl CredentialsStore for InMemoryCredentialsStore {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn contents(&self) -> Arc<StoreContents> {
        // A poisoned lock still guards a complete state: writers only ever
        // assign a finished Arc.
        match self.contents.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    fn add_domain(&self, domain: Domain) -> Result<(), StoreError> {
        self.modify(|contents| contents.add_domain(domain))
    }

    fn add(&self, domain: Option<&str>, credential: Credential) -> Result<(), StoreError> {
        let credential = self.owned(credential);
        self.modify(|contents| contents.add(domain, credential))
    }

    fn update(&self, id: &str, credential: Credential) -> Result<(), StoreError> {
        let credential = self.owned(credential);
        self.modify(|contents| contents.update(id, credential))
    }

    fn remove(&self, id: &str) -> Result<Credential, StoreError> {
        self.modify(|contents| contents.remove(id))
    }

    fn save(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryCredentialsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialsStore")
            .field("scope", &self.scope)
            .field("credentials", &self.contents().len())
            .finish()
    }
}
