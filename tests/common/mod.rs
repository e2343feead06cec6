//! Common test utilities for integration tests
//!
//! Shared fixtures: codecs, the `myCert` certificate credential, stores and
//! an in-process channel connector.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use keywarden::domain::ports::{RemoteConnector, RemoteStream};
use keywarden::infrastructure::crypto::FileMasterKeyProvider;
use keywarden::{
    AesGcmCodec, Credential, KeyStoreFormat, KeyStoreSource, PlaintextBytes, SecretBytes,
    SecretCodec,
};
use tempfile::TempDir;
use tokio::io::DuplexStream;
use tokio::sync::Mutex;

/// PKCS#12 keystore holding one EC key entry under alias `1`, protected by
/// `MY_CERT_PASSWORD`.
#[allow(dead_code)]
pub const MY_CERT_KEYSTORE: &[u8] = include_bytes!("../fixtures/my_cert.p12");

#[allow(dead_code)]
pub const MY_CERT_ALIAS: &str = "1";

#[allow(dead_code)]
pub const MY_CERT_PASSWORD: &str = "password";

/// Create a temporary directory for test isolation
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Codec backed by a key ring file inside `dir`.
#[allow(dead_code)]
pub fn file_codec(dir: &Path) -> Arc<AesGcmCodec> {
    Arc::new(AesGcmCodec::new(Arc::new(FileMasterKeyProvider::new(
        dir.join("secrets").join("master.key"),
    ))))
}

/// The `myCert` certificate with an uploaded PKCS#12 keystore.
#[allow(dead_code)]
pub fn my_cert(codec: &dyn SecretCodec) -> Credential {
    let password = SecretBytes::seal(codec, &PlaintextBytes::from(MY_CERT_PASSWORD))
        .expect("Failed to seal password");
    let source = KeyStoreSource::upload(
        codec,
        &PlaintextBytes::from(MY_CERT_KEYSTORE),
        KeyStoreFormat::Pkcs12,
    )
    .expect("Failed to upload keystore");
    Credential::certificate(Some("myCert"), "release signing", password, source)
}

#[allow(dead_code)]
pub fn user(codec: &dyn SecretCodec, id: &str, username: &str) -> Credential {
    let password = SecretBytes::seal(codec, &PlaintextBytes::from("s3cret"))
        .expect("Failed to seal password");
    Credential::username_password(Some(id), "", username, password)
}

/// Connector handing out one pre-made in-process stream.
#[allow(dead_code)]
pub struct DuplexConnector(Mutex<Option<DuplexStream>>);

#[allow(dead_code)]
impl DuplexConnector {
    pub fn new(stream: DuplexStream) -> Self {
        Self(Mutex::new(Some(stream)))
    }
}

#[async_trait]
impl RemoteConnector for DuplexConnector {
    fn target(&self) -> String {
        "duplex".to_string()
    }

    async fn connect(&self) -> std::io::Result<Box<dyn RemoteStream>> {
        self.0
            .lock()
            .await
            .take()
            .map(|stream| Box::new(stream) as Box<dyn RemoteStream>)
            .ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "already connected")
            })
    }
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
#[allow(dead_code)]
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
