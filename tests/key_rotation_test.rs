//! Master key rotation against real key ring and store files.

mod common;

use std::sync::Arc;

use keywarden::infrastructure::crypto::{FileMasterKeyProvider, MasterKeyProvider};
use keywarden::infrastructure::logging::AuditLogger;
use keywarden::services::maintenance::{rotate_master_key, verify_store};
use keywarden::{
    AesGcmCodec, CredentialType, CredentialsStore, DecryptError, FileCredentialsStore, Scope,
    SecretCodec,
};

#[test]
fn test_old_epoch_blobs_load_and_are_rewrapped() {
    let dir = common::temp_dir();
    let key_path = dir.path().join("secrets").join("master.key");
    let store_path = dir.path().join("global.json");

    {
        let codec = common::file_codec(dir.path());
        let store = FileCredentialsStore::open(&store_path, Scope::Global, codec.clone()).unwrap();
        store.add(None, common::my_cert(codec.as_ref())).unwrap();
        store.save().unwrap();
    }

    // Another process rotates the ring file without touching the store.
    let rotated = FileMasterKeyProvider::new(&key_path).rotate().unwrap();
    assert_eq!(rotated.epochs(), vec![1, 2]);

    let codec = common::file_codec(dir.path());
    let before = std::fs::read(&store_path).unwrap();
    let store = FileCredentialsStore::open_existing(&store_path, codec.clone()).unwrap();
    let report = store.load_report();
    assert_eq!(report.credentials, 1);
    assert_eq!(report.rewrapped, 2, "password and keystore are both rewrapped");
    assert_eq!(report.unavailable, 0);
    assert_ne!(std::fs::read(&store_path).unwrap(), before);

    let credential = store.find_by_id("myCert", CredentialType::Certificate).unwrap();
    for secret in credential.secrets() {
        assert_eq!(secret.blob().epoch(), 2);
        assert!(!codec.is_stale(secret.blob()));
    }
    assert_eq!(
        credential.decrypt_password(codec.as_ref()).unwrap().as_str(),
        common::MY_CERT_PASSWORD
    );
}

#[test]
fn test_rotate_master_key_service() {
    let dir = common::temp_dir();
    let codec = common::file_codec(dir.path());
    let store = FileCredentialsStore::open(dir.path().join("global.json"), Scope::Global, codec.clone())
        .unwrap();
    store.add(None, common::user(codec.as_ref(), "deploy", "ci")).unwrap();
    store.save().unwrap();
    let stores = vec![Arc::new(store)];

    let audit_path = dir.path().join("audit.log");
    let audit = AuditLogger::new(&audit_path).unwrap();
    let report = rotate_master_key(&codec, &stores, &audit).unwrap();
    assert_eq!(report.epoch, 2);
    assert_eq!(report.stores[0].rewrapped, 1);
    assert!(verify_store(stores[0].as_ref(), codec.as_ref()).is_healthy());

    let trail = std::fs::read_to_string(&audit_path).unwrap();
    assert!(trail.contains("\"key_rotated\""));
    assert!(!trail.contains("s3cret"));
}

#[test]
fn test_blobs_from_another_installation_report_key_mismatch() {
    let ours = common::temp_dir();
    let theirs = common::temp_dir();
    let their_codec = common::file_codec(theirs.path());
    let store_path = theirs.path().join("global.json");
    {
        let store =
            FileCredentialsStore::open(&store_path, Scope::Global, their_codec.clone()).unwrap();
        store.add(None, common::user(their_codec.as_ref(), "deploy", "ci")).unwrap();
        store.save().unwrap();
    }

    let our_codec = common::file_codec(ours.path());
    let before = std::fs::read(&store_path).unwrap();
    let store = FileCredentialsStore::open_existing(&store_path, our_codec.clone()).unwrap();
    assert_eq!(store.load_report().unavailable, 1);
    assert_eq!(std::fs::read(&store_path).unwrap(), before, "foreign secrets are left as they are");

    let credential = store.find_by_id("deploy", CredentialType::Any).unwrap();
    assert_eq!(
        credential.decrypt_password(our_codec.as_ref()).unwrap_err(),
        DecryptError::KeyMismatch
    );
    let report = verify_store(&store, our_codec.as_ref() as &dyn SecretCodec);
    assert_eq!(report.unavailable.len(), 1);
}
