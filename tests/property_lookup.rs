mod common;

use std::sync::Arc;

use keywarden::domain::models::CredentialKind;
use keywarden::{
    AesGcmCodec, Credential, CredentialType, CredentialsProviderRegistry, CredentialsStore,
    InMemoryCredentialsStore, RequirementSet, Scope, ScopeChain,
};
use proptest::prelude::*;

fn username(credential: &Credential) -> String {
    match &credential.kind {
        CredentialKind::UsernamePassword(up) => up.username.clone(),
        CredentialKind::Certificate(_) => String::new(),
    }
}

/// Stores along one scope chain, each holding ids from a small alphabet so
/// the same id shows up in several stores. Usernames record `store/slot`.
fn registry_from(layout: &[Vec<u8>], codec: &AesGcmCodec) -> CredentialsProviderRegistry {
    let scopes = [
        Scope::Global,
        Scope::Folder("team".into()),
        Scope::Folder("team/infra".into()),
        Scope::Item("team/infra/deploy".into()),
    ];
    let mut builder = CredentialsProviderRegistry::builder();
    for (index, ids) in layout.iter().enumerate() {
        let store = InMemoryCredentialsStore::new(scopes[index % scopes.len()].clone());
        for (slot, id) in ids.iter().enumerate() {
            let credential = common::user(codec, &format!("id-{id}"), &format!("{index}/{slot}"));
            // Ids repeat within a generated store; the store keeps the first.
            let _ = store.add(None, credential);
        }
        builder = builder.register(Arc::new(store));
    }
    builder.build()
}

fn layouts() -> impl Strategy<Value = Vec<Vec<u8>>> {
    proptest::collection::vec(proptest::collection::vec(0u8..4, 0..6), 1..6)
}

proptest! {
    /// Property: repeated lookups over unchanged stores return the same sequence
    #[test]
    fn prop_lookup_is_deterministic(layout in layouts()) {
        let codec = AesGcmCodec::ephemeral();
        let registry = registry_from(&layout, &codec);
        let chain = ScopeChain::for_item("team/infra/deploy");

        let first = registry.lookup(CredentialType::Any, &chain, &RequirementSet::empty(), None);
        let second = registry.lookup(CredentialType::Any, &chain, &RequirementSet::empty(), None);
        prop_assert_eq!(first, second);
    }

    /// Property: results follow registration order, then insertion order,
    /// and the first registered store wins for a duplicated id
    #[test]
    fn prop_registration_order_breaks_ties(layout in layouts(), wanted in 0u8..4) {
        let codec = AesGcmCodec::ephemeral();
        let registry = registry_from(&layout, &codec);
        let chain = ScopeChain::for_item("team/infra/deploy");

        let all = registry.lookup(CredentialType::Any, &chain, &RequirementSet::empty(), None);
        let expected: Vec<String> = registry
            .stores()
            .iter()
            .flat_map(|store| store.list())
            .map(|c| username(&c))
            .collect();
        let actual: Vec<String> = all.iter().map(username).collect();
        prop_assert_eq!(&actual, &expected);

        let id = format!("id-{wanted}");
        let first = registry.lookup_one(
            CredentialType::Any,
            &chain,
            &RequirementSet::empty(),
            Some(&id),
        );
        let expected_first = registry
            .stores()
            .iter()
            .find_map(|store| store.find_by_id(&id, CredentialType::Any));
        prop_assert_eq!(first.as_ref().map(username), expected_first.as_ref().map(username));
        if let Some(found) = first {
            let store_index: usize = username(&found)
                .split('/')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap();
            let earlier_has_id = layout[..store_index]
                .iter()
                .any(|ids| ids.contains(&wanted));
            prop_assert!(!earlier_has_id);
        }
    }
}
