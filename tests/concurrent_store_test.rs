//! Readers running while a writer mutates and saves must only ever see
//! complete store states, in memory and on disk.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use keywarden::adapters::file::StoreDocument;
use keywarden::{
    AesGcmCodec, CredentialType, CredentialsProviderRegistry, CredentialsStore,
    FileCredentialsStore, InMemoryCredentialsStore, RequirementSet, Scope, ScopeChain,
};

const WRITES: usize = 150;
const READERS: usize = 4;

/// Ids must be exactly `cred-0 .. cred-(n-1)` in order.
fn assert_contiguous(ids: &[String]) {
    for (index, id) in ids.iter().enumerate() {
        assert_eq!(id, &format!("cred-{index}"), "torn view: {ids:?}");
    }
}

fn hammer(store: Arc<dyn CredentialsStore>, codec: Arc<AesGcmCodec>, on_disk: Option<std::path::PathBuf>) {
    let registry = CredentialsProviderRegistry::builder()
        .register(Arc::clone(&store))
        .build();
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        for _ in 0..READERS {
            scope.spawn(|| {
                let mut last_seen = 0;
                while !done.load(Ordering::Acquire) {
                    let found = registry.lookup(
                        CredentialType::Any,
                        &ScopeChain::global(),
                        &RequirementSet::empty(),
                        None,
                    );
                    let ids: Vec<String> = found.into_iter().map(|c| c.id).collect();
                    assert_contiguous(&ids);
                    assert!(ids.len() >= last_seen, "store went backwards");
                    last_seen = ids.len();

                    if let Some(path) = &on_disk {
                        if let Ok(raw) = std::fs::read(path) {
                            let document = StoreDocument::parse(&raw)
                                .expect("readers must never see a partially written file");
                            let ids: Vec<String> =
                                document.into_contents().iter().map(|c| c.id.clone()).collect();
                            assert_contiguous(&ids);
                        }
                    }
                }
            });
        }

        scope.spawn(|| {
            for index in 0..WRITES {
                store
                    .add(None, common::user(codec.as_ref(), &format!("cred-{index}"), "u"))
                    .unwrap();
                store.save().unwrap();
            }
            done.store(true, Ordering::Release);
        });
    });

    assert_eq!(store.list().len(), WRITES);
}

#[test]
fn test_concurrent_lookups_in_memory() {
    let codec = Arc::new(AesGcmCodec::ephemeral());
    let store: Arc<dyn CredentialsStore> = Arc::new(InMemoryCredentialsStore::new(Scope::Global));
    hammer(store, codec, None);
}

#[test]
fn test_concurrent_lookups_on_disk() {
    let dir = common::temp_dir();
    let codec = Arc::new(AesGcmCodec::ephemeral());
    let path = dir.path().join("global.json");
    let store = FileCredentialsStore::open(&path, Scope::Global, codec.clone()).unwrap();
    hammer(Arc::new(store), codec.clone(), Some(path.clone()));

    let reopened = FileCredentialsStore::open_existing(&path, codec).unwrap();
    assert_eq!(reopened.list().len(), WRITES);
}
