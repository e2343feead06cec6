//! End-to-end flow for a certificate credential: store, lookup, snapshot,
//! wire transfer and binding on the receiving side.

mod common;

use std::io::Write;
use std::sync::Arc;

use keywarden::domain::models::config::{BindingConfig, RemoteConfig};
use keywarden::{
    AesGcmCodec, CertificateBinding, CredentialReceiver, CredentialTransfer, CredentialType,
    CredentialsProviderRegistry, CredentialsStore, FileCredentialsStore, KeyStoreFormat,
    KeyStoreSource, PlaintextBytes, RequirementSet, Scope, ScopeChain, SecretBytes,
    SnapshotEngine, WireEnvelope,
};
use keywarden::Credential;

#[tokio::test]
async fn test_my_cert_round_trip() {
    common::setup_test_logging();
    let dir = common::temp_dir();
    let codec = common::file_codec(dir.path());

    let store = FileCredentialsStore::open(
        dir.path().join("stores").join("global.json"),
        Scope::Global,
        codec.clone(),
    )
    .unwrap();
    store.add(None, common::my_cert(codec.as_ref())).unwrap();
    store.save().unwrap();

    // Reopen from disk so the lookup runs against persisted state.
    let reopened =
        FileCredentialsStore::open_existing(store.path().to_path_buf(), codec.clone()).unwrap();
    let registry = CredentialsProviderRegistry::builder()
        .register(Arc::new(reopened))
        .build();

    let credential = registry
        .lookup_one(
            CredentialType::Certificate,
            &ScopeChain::for_item("team/release"),
            &RequirementSet::empty(),
            Some("myCert"),
        )
        .expect("myCert should be visible from any item");

    let engine = SnapshotEngine::new(codec.clone());
    let detached = engine.snapshot(&credential).unwrap();
    let keystore = detached.keystore_bytes(codec.as_ref()).unwrap().unwrap();
    assert_eq!(keystore.as_bytes(), common::MY_CERT_KEYSTORE);
    assert_eq!(
        detached.password(codec.as_ref()).unwrap().as_str(),
        common::MY_CERT_PASSWORD
    );

    // Receiving side has its own key material.
    let remote_codec = Arc::new(AesGcmCodec::ephemeral());
    let (local, remote) = tokio::io::duplex(64 * 1024);
    let receiver = CredentialReceiver::new(remote_codec.clone(), RemoteConfig::default());
    let peer = tokio::spawn(async move { receiver.receive(remote).await });

    let transfer = CredentialTransfer::new(
        Arc::new(common::DuplexConnector::new(local)),
        codec.clone(),
        RemoteConfig::default(),
    );
    assert_eq!(transfer.send(&detached).await.unwrap(), "myCert");

    let received = peer.await.unwrap().unwrap();
    assert_eq!(received.id(), "myCert");
    assert_eq!(received.keystore_format(), Some(KeyStoreFormat::Pkcs12));
    let remote_keystore = received.keystore_bytes(remote_codec.as_ref()).unwrap().unwrap();
    assert_eq!(remote_keystore.as_bytes(), common::MY_CERT_KEYSTORE);
    assert_eq!(
        received.password(remote_codec.as_ref()).unwrap().as_str(),
        common::MY_CERT_PASSWORD
    );
    // The sender's key opens nothing on the remote copy.
    assert!(received.password(codec.as_ref()).is_err());

    let workspace = common::temp_dir();
    let bound = CertificateBinding::new("KEYSTORE", "KEYSTORE_PASSWORD")
        .bind(
            &received,
            workspace.path(),
            remote_codec.as_ref(),
            &BindingConfig::default(),
        )
        .unwrap();
    assert_eq!(
        std::fs::read(bound.keystore_path()).unwrap(),
        common::MY_CERT_KEYSTORE
    );
}

#[test]
fn test_wire_envelope_round_trip_between_installations() {
    let sender = Arc::new(AesGcmCodec::ephemeral());
    let receiver = AesGcmCodec::ephemeral();
    let detached = SnapshotEngine::new(sender.clone())
        .snapshot(&common::my_cert(sender.as_ref()))
        .unwrap();

    let bytes = WireEnvelope::encode(&detached, sender.as_ref()).unwrap();
    let decoded = WireEnvelope::decode(&bytes, &receiver).unwrap();

    assert_eq!(decoded.id(), detached.id());
    assert_eq!(decoded.description(), detached.description());
    assert_eq!(
        decoded.keystore_bytes(&receiver).unwrap().unwrap().as_bytes(),
        common::MY_CERT_KEYSTORE
    );
}

#[test]
fn test_snapshot_survives_deleted_source_file() {
    let codec = Arc::new(AesGcmCodec::ephemeral());
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(common::MY_CERT_KEYSTORE).unwrap();

    let password =
        SecretBytes::seal(codec.as_ref(), &PlaintextBytes::from(common::MY_CERT_PASSWORD))
            .unwrap();
    let credential = Credential::certificate(
        Some("myCert"),
        "",
        password,
        KeyStoreSource::on_disk(file.path(), KeyStoreFormat::Pkcs12),
    );

    let engine = SnapshotEngine::new(codec.clone());
    let detached = engine.snapshot(&credential).unwrap();
    file.close().unwrap();

    assert!(credential.as_certificate().unwrap().key_store_source.keystore_bytes(codec.as_ref()).is_err());
    assert_eq!(
        detached.keystore_bytes(codec.as_ref()).unwrap().unwrap().as_bytes(),
        common::MY_CERT_KEYSTORE
    );
    assert_eq!(engine.snapshot(detached.credential()).unwrap(), detached);
}

#[test]
fn test_my_cert_fixture_is_a_pkcs12_keystore() {
    assert_eq!(
        KeyStoreFormat::detect(common::MY_CERT_KEYSTORE),
        Some(KeyStoreFormat::Pkcs12)
    );

    // DER SEQUENCE whose two-byte length covers the rest of the file.
    let declared = usize::from(u16::from_be_bytes([
        common::MY_CERT_KEYSTORE[2],
        common::MY_CERT_KEYSTORE[3],
    ]));
    assert_eq!(declared + 4, common::MY_CERT_KEYSTORE.len());

    // friendlyName attribute: BMPString of the alias.
    let mut alias = vec![0x1e, 0x02 * u8::try_from(common::MY_CERT_ALIAS.len()).unwrap()];
    for unit in common::MY_CERT_ALIAS.encode_utf16() {
        alias.extend_from_slice(&unit.to_be_bytes());
    }
    assert!(common::MY_CERT_KEYSTORE
        .windows(alias.len())
        .any(|window| window == alias.as_slice()));
}
