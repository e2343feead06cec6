//! Secret value types.
//!
//! Encryption state lives in the type: `PlaintextBytes` is the only type that
//! holds cleartext and it cannot be serialized; `CipherBlob` and
//! `SecretBytes` only ever hold ciphertext and are what gets persisted.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::domain::errors::{DecryptError, EncryptError};
use crate::domain::ports::SecretCodec;

/// Leading byte of every ciphertext blob produced by this crate.
pub const CIPHER_FORMAT_MARKER: u8 = 0x4B;
/// Length of a key fingerprint embedded in a blob header.
pub const FINGERPRINT_LEN: usize = 8;
/// Length of the AEAD nonce.
pub const NONCE_LEN: usize = 12;
/// Length of the AEAD authentication tag.
pub const TAG_LEN: usize = 16;
/// marker + epoch + fingerprint + nonce
pub const HEADER_LEN: usize = 1 + 4 + FINGERPRINT_LEN + NONCE_LEN;

/// Cleartext secret bytes, wiped from memory on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextBytes(Zeroizing<Vec<u8>>);

impl PlaintextBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Interpret the bytes as UTF-8 text, e.g. for a password.
    pub fn to_utf8(&self) -> Result<Zeroizing<String>, DecryptError> {
        std::str::from_utf8(&self.0)
            .map(|s| Zeroizing::new(s.to_string()))
            .map_err(|_| DecryptError::Malformed("secret is not valid UTF-8".to_string()))
    }
}

impl From<&str> for PlaintextBytes {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes().to_vec())
    }
}

impl From<&[u8]> for PlaintextBytes {
    fn from(value: &[u8]) -> Self {
        Self::new(value.to_vec())
    }
}

impl fmt::Debug for PlaintextBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PlaintextBytes([REDACTED; {} bytes])", self.0.len())
    }
}

/// An authenticated ciphertext blob.
///
/// Layout: `[marker][epoch u32 BE][key fingerprint][nonce][ciphertext + tag]`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CipherBlob(Vec<u8>);

impl CipherBlob {
    /// Validate the structure of a raw blob without decrypting it.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, DecryptError> {
        if bytes.len() < HEADER_LEN + TAG_LEN {
            return Err(DecryptError::Malformed(format!(
                "blob is {} bytes, shorter than the {} byte minimum",
                bytes.len(),
                HEADER_LEN + TAG_LEN
            )));
        }
        if bytes[0] != CIPHER_FORMAT_MARKER {
            return Err(DecryptError::Malformed(format!(
                "unknown blob format marker 0x{:02x}",
                bytes[0]
            )));
        }
        Ok(Self(bytes))
    }

    /// Build a blob from its parts.
    pub fn assemble(
        epoch: u32,
        fingerprint: [u8; FINGERPRINT_LEN],
        nonce: [u8; NONCE_LEN],
        sealed: &[u8],
    ) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_LEN + sealed.len());
        bytes.push(CIPHER_FORMAT_MARKER);
        bytes.extend_from_slice(&epoch.to_be_bytes());
        bytes.extend_from_slice(&fingerprint);
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(sealed);
        Self(bytes)
    }

    pub fn epoch(&self) -> u32 {
        u32::from_be_bytes([self.0[1], self.0[2], self.0[3], self.0[4]])
    }

    pub fn fingerprint(&self) -> [u8; FINGERPRINT_LEN] {
        let mut fp = [0u8; FINGERPRINT_LEN];
        fp.copy_from_slice(&self.0[5..5 + FINGERPRINT_LEN]);
        fp
    }

    pub fn nonce(&self) -> &[u8] {
        &self.0[5 + FINGERPRINT_LEN..HEADER_LEN]
    }

    /// Ciphertext followed by the authentication tag.
    pub fn sealed(&self) -> &[u8] {
        &self.0[HEADER_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.0)
    }

    pub fn from_base64(encoded: &str) -> Result<Self, DecryptError> {
        let bytes = BASE64_STANDARD
            .decode(encoded.trim())
            .map_err(|e| DecryptError::Malformed(format!("invalid base64: {e}")))?;
        Self::from_bytes(bytes)
    }
}

impl fmt::Debug for CipherBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherBlob")
            .field("epoch", &self.epoch())
            .field("len", &self.0.len())
            .finish()
    }
}

impl Serialize for CipherBlob {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

impl<'de> Deserialize<'de> for CipherBlob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

/// A secret field that is always encrypted at rest.
///
/// Equality and serialization operate on ciphertext. The plaintext is only
/// reachable through [`SecretBytes::decrypt`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretBytes(CipherBlob);

impl SecretBytes {
    /// Encrypt plaintext into a new secret.
    pub fn seal(codec: &dyn SecretCodec, plaintext: &PlaintextBytes) -> Result<Self, EncryptError> {
        codec.encrypt(plaintext).map(Self)
    }

    /// Accept bytes that may already be ciphertext under the current key.
    ///
    /// Already-encrypted input is kept verbatim so re-importing an exported
    /// secret does not double-encrypt it.
    pub fn from_raw(codec: &dyn SecretCodec, raw: &[u8]) -> Result<Self, EncryptError> {
        codec.wrap(raw).map(Self)
    }

    pub const fn from_blob(blob: CipherBlob) -> Self {
        Self(blob)
    }

    pub const fn blob(&self) -> &CipherBlob {
        &self.0
    }

    pub fn decrypt(&self, codec: &dyn SecretCodec) -> Result<PlaintextBytes, DecryptError> {
        codec.decrypt(&self.0)
    }

    pub fn decrypt_utf8(&self, codec: &dyn SecretCodec) -> Result<Zeroizing<String>, DecryptError> {
        self.decrypt(codec)?.to_utf8()
    }

    /// Whether this secret was sealed under an older key epoch.
    pub fn is_stale(&self, codec: &dyn SecretCodec) -> bool {
        codec.is_stale(&self.0)
    }

    /// Re-encrypt under the current key epoch.
    pub fn rewrap(&self, codec: &dyn SecretCodec) -> Result<Self, DecryptError> {
        codec.rewrap(&self.0).map(Self)
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes(epoch={}, [REDACTED])", self.0.epoch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blob() -> CipherBlob {
        CipherBlob::assemble(3, [7u8; FINGERPRINT_LEN], [1u8; NONCE_LEN], &[9u8; 24])
    }

    #[test]
    fn test_blob_header_accessors() {
        let blob = sample_blob();
        assert_eq!(blob.epoch(), 3);
        assert_eq!(blob.fingerprint(), [7u8; FINGERPRINT_LEN]);
        assert_eq!(blob.nonce(), &[1u8; NONCE_LEN]);
        assert_eq!(blob.sealed(), &[9u8; 24]);
    }

    #[test]
    fn test_blob_rejects_short_input() {
        let result = CipherBlob::from_bytes(vec![CIPHER_FORMAT_MARKER; 10]);
        assert!(matches!(result, Err(DecryptError::Malformed(_))));
    }

    #[test]
    fn test_blob_rejects_unknown_marker() {
        let mut bytes = sample_blob().as_bytes().to_vec();
        bytes[0] = 0x00;
        assert!(matches!(
            CipherBlob::from_bytes(bytes),
            Err(DecryptError::Malformed(_))
        ));
    }

    #[test]
    fn test_blob_serializes_as_base64_string() {
        let blob = sample_blob();
        let json = serde_json::to_string(&blob).unwrap();
        assert!(json.starts_with('"'));
        let back: CipherBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }

    #[test]
    fn test_debug_never_shows_plaintext() {
        let plain = PlaintextBytes::from("hunter2");
        let rendered = format!("{plain:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));

        let secret = SecretBytes::from_blob(sample_blob());
        assert!(format!("{secret:?}").contains("REDACTED"));
    }

    #[test]
    fn test_plaintext_utf8() {
        let plain = PlaintextBytes::from("password");
        assert_eq!(plain.to_utf8().unwrap().as_str(), "password");

        let invalid = PlaintextBytes::new(vec![0xff, 0xfe]);
        assert!(invalid.to_utf8().is_err());
    }
}
