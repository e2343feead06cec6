//! Binary envelope carrying one detached credential to a remote process.
//!
//! Layout:
//!
//! ```text
//! "KWSN" | version u8 | kind u8 | id | description | scope u8 | scope path | kind fields
//! ```
//!
//! Every variable-length field is a `u32` big-endian length followed by the
//! bytes. Kind fields are `password | format u8 | keystore` for certificates
//! and `username | password` for username/password credentials.
//!
//! Secrets travel as plaintext inside the envelope: the receiver does not
//! share the sender's master key, and the channel carrying the envelope
//! provides confidentiality. [`WireEnvelope::decode`] seals them again under
//! the receiver's codec before anything else sees them.

use bytes::{Buf, BufMut};
use zeroize::Zeroizing;

use crate::domain::errors::WireError;
use crate::domain::models::credential::{Credential, CredentialKind, Scope};
use crate::domain::models::keystore::{KeyStoreFormat, KeyStoreSource};
use crate::domain::models::secret::{PlaintextBytes, SecretBytes};
use crate::domain::models::snapshot::DetachedCredential;
use crate::domain::ports::SecretCodec;

pub const ENVELOPE_MAGIC: &[u8; 4] = b"KWSN";
pub const ENVELOPE_VERSION: u8 = 1;

const KIND_CERTIFICATE: u8 = 1;
const KIND_USERNAME_PASSWORD: u8 = 2;

pub struct WireEnvelope;

/// Opened kind fields, held only while an envelope is being written.
enum KindFields<'a> {
    Certificate {
        password: PlaintextBytes,
        format: KeyStoreFormat,
        keystore: PlaintextBytes,
    },
    UsernamePassword {
        username: &'a str,
        password: PlaintextBytes,
    },
}

impl KindFields<'_> {
    fn encoded_len(&self) -> usize {
        match self {
            Self::Certificate {
                password, keystore, ..
            } => field_len(password.as_bytes()) + 1 + field_len(keystore.as_bytes()),
            Self::UsernamePassword { username, password } => {
                field_len(username.as_bytes()) + field_len(password.as_bytes())
            }
        }
    }
}

impl WireEnvelope {
    /// Serialize a detached credential, opening its secrets with `codec`.
    ///
    /// The buffer is sized up front and never grows, so the only copy of the
    /// plaintext secrets is the returned one, wiped on drop.
    pub fn encode(
        credential: &DetachedCredential,
        codec: &dyn SecretCodec,
    ) -> Result<Zeroizing<Vec<u8>>, WireError> {
        let inner = credential.credential();
        let scope_path = inner.scope.path().unwrap_or("");

        let secrets = match &inner.kind {
            CredentialKind::Certificate(cert) => KindFields::Certificate {
                password: cert.password.decrypt(codec)?,
                format: cert.key_store_source.keystore_format(),
                keystore: cert.key_store_source.keystore_bytes(codec)?,
            },
            CredentialKind::UsernamePassword(up) => KindFields::UsernamePassword {
                username: &up.username,
                password: up.password.decrypt(codec)?,
            },
        };

        let capacity = ENVELOPE_MAGIC.len()
            + 2
            + field_len(inner.id.as_bytes())
            + field_len(inner.description.as_bytes())
            + 1
            + field_len(scope_path.as_bytes())
            + secrets.encoded_len();
        let mut buf = Zeroizing::new(Vec::with_capacity(capacity));

        buf.put_slice(ENVELOPE_MAGIC);
        buf.put_u8(ENVELOPE_VERSION);
        buf.put_u8(inner.kind.wire_tag());
        put_field(&mut buf, "id", inner.id.as_bytes())?;
        put_field(&mut buf, "description", inner.description.as_bytes())?;
        buf.put_u8(inner.scope.wire_tag());
        put_field(&mut buf, "scope path", scope_path.as_bytes())?;

        match &secrets {
            KindFields::Certificate {
                password,
                format,
                keystore,
            } => {
                put_field(&mut buf, "password", password.as_bytes())?;
                buf.put_u8(format.wire_tag());
                put_field(&mut buf, "keystore", keystore.as_bytes())?;
            }
            KindFields::UsernamePassword { username, password } => {
                put_field(&mut buf, "username", username.as_bytes())?;
                put_field(&mut buf, "password", password.as_bytes())?;
            }
        }
        debug_assert_eq!(buf.len(), capacity);
        Ok(buf)
    }

    /// Parse an envelope, sealing its secrets under `codec`.
    pub fn decode(raw: &[u8], codec: &dyn SecretCodec) -> Result<DetachedCredential, WireError> {
        let mut buf = raw;

        if buf.remaining() < ENVELOPE_MAGIC.len() || &buf[..ENVELOPE_MAGIC.len()] != ENVELOPE_MAGIC {
            return Err(WireError::BadMagic);
        }
        buf.advance(ENVELOPE_MAGIC.len());

        let version = get_u8(&mut buf, "version")?;
        if version != ENVELOPE_VERSION {
            return Err(WireError::UnsupportedVersion(version));
        }
        let kind = get_u8(&mut buf, "kind")?;
        let id = get_string(&mut buf, "id")?;
        let description = get_string(&mut buf, "description")?;
        let scope_tag = get_u8(&mut buf, "scope")?;
        let scope_path = get_string(&mut buf, "scope path")?;
        let scope = match scope_tag {
            0 => Scope::Global,
            1 => Scope::Folder(scope_path),
            2 => Scope::Item(scope_path),
            tag => return Err(WireError::UnknownTag { field: "scope", tag }),
        };

        let mut credential = match kind {
            KIND_CERTIFICATE => {
                let password = get_secret(&mut buf, "password")?;
                let format_tag = get_u8(&mut buf, "keystore format")?;
                let format = KeyStoreFormat::from_wire_tag(format_tag).ok_or(
                    WireError::UnknownTag {
                        field: "keystore format",
                        tag: format_tag,
                    },
                )?;
                let keystore = get_secret(&mut buf, "keystore")?;
                Credential::certificate(
                    Some(id.as_str()),
                    description,
                    SecretBytes::seal(codec, &password)?,
                    KeyStoreSource::Uploaded {
                        keystore: SecretBytes::seal(codec, &keystore)?,
                        format,
                    },
                )
            }
            KIND_USERNAME_PASSWORD => {
                let username = get_string(&mut buf, "username")?;
                let password = get_secret(&mut buf, "password")?;
                Credential::username_password(
                    Some(id.as_str()),
                    description,
                    username,
                    SecretBytes::seal(codec, &password)?,
                )
            }
            tag => return Err(WireError::UnknownTag { field: "kind", tag }),
        };

        if buf.has_remaining() {
            return Err(WireError::TrailingBytes(buf.remaining()));
        }

        // Keep the sender's id verbatim, even a blank one.
        credential.id = id;
        credential.scope = scope;
        DetachedCredential::try_new(credential).map_err(|_| WireError::UnknownTag {
            field: "keystore source",
            tag: 0,
        })
    }
}

const fn field_len(bytes: &[u8]) -> usize {
    4 + bytes.len()
}

fn put_field(buf: &mut Vec<u8>, field: &'static str, bytes: &[u8]) -> Result<(), WireError> {
    let len = u32::try_from(bytes.len()).map_err(|_| WireError::FieldTooLarge {
        field,
        max: u32::MAX as usize,
    })?;
    buf.put_u32(len);
    buf.put_slice(bytes);
    Ok(())
}

fn get_u8(buf: &mut &[u8], field: &'static str) -> Result<u8, WireError> {
    if buf.remaining() < 1 {
        return Err(WireError::Truncated(field));
    }
    Ok(buf.get_u8())
}

fn get_field<'a>(buf: &mut &'a [u8], field: &'static str) -> Result<&'a [u8], WireError> {
    if buf.remaining() < 4 {
        return Err(WireError::Truncated(field));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(WireError::Truncated(field));
    }
    let whole: &'a [u8] = *buf;
    let (value, rest) = whole.split_at(len);
    *buf = rest;
    Ok(value)
}

fn get_string(buf: &mut &[u8], field: &'static str) -> Result<String, WireError> {
    let bytes = get_field(buf, field)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| WireError::InvalidUtf8(field))
}

fn get_secret(buf: &mut &[u8], field: &'static str) -> Result<PlaintextBytes, WireError> {
    get_field(buf, field).map(PlaintextBytes::from)
}
