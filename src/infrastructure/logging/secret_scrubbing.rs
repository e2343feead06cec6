use regex::{Captures, Regex};
use std::fmt;
use std::io;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Shortest run of base64 characters treated as an encoded secret.
const MIN_BASE64_RUN: usize = 40;

/// Redacts secret-looking material from formatted log lines.
#[derive(Clone)]
pub struct SecretScrubber {
    password_pattern: Regex,
    private_key_pattern: Regex,
    base64_pattern: Regex,
}

impl SecretScrubber {
    /// Create a new secret scrubber
    pub fn new() -> Self {
        Self {
            // password=..., "keystore_password": "...", passphrase: ...
            password_pattern: Regex::new(
                r#"(?i)(["']?(?:[a-z_]*password|passphrase|secret)["']?\s*[:=]\s*)["']?[^"'\s,}]+["']?"#,
            )
            .expect("password pattern is valid"),
            private_key_pattern: Regex::new(
                r"(?s)-----BEGIN ([A-Z ]*)PRIVATE KEY-----.*?-----END [A-Z ]*PRIVATE KEY-----",
            )
            .expect("private key pattern is valid"),
            base64_pattern: Regex::new(&format!(r"[A-Za-z0-9+/]{{{MIN_BASE64_RUN},}}={{0,2}}"))
                .expect("base64 pattern is valid"),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = self
            .private_key_pattern
            .replace_all(message, "[PRIVATE_KEY_REDACTED]");
        let scrubbed = self
            .password_pattern
            .replace_all(&scrubbed, "${1}[REDACTED]");
        self.base64_pattern
            .replace_all(&scrubbed, |caps: &Captures| {
                let run = &caps[0];
                if looks_encoded(run) {
                    "[BASE64_REDACTED]".to_string()
                } else {
                    run.to_string()
                }
            })
            .into_owned()
    }
}

/// Paths and identifiers rarely mix all three character classes.
fn looks_encoded(run: &str) -> bool {
    run.bytes().any(|b| b.is_ascii_digit())
        && run.bytes().any(|b| b.is_ascii_uppercase())
        && run.bytes().any(|b| b.is_ascii_lowercase())
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}

/// Wraps a [`MakeWriter`] so every formatted event is scrubbed before it
/// reaches the underlying writer.
#[derive(Clone, Debug)]
pub struct ScrubbingMakeWriter<M> {
    inner: M,
    scrubber: Arc<SecretScrubber>,
}

impl<M> ScrubbingMakeWriter<M> {
    pub fn new(inner: M) -> Self {
        Self::with_scrubber(inner, Arc::new(SecretScrubber::new()))
    }

    pub const fn with_scrubber(inner: M, scrubber: Arc<SecretScrubber>) -> Self {
        Self { inner, scrubber }
    }
}

impl<'a, M> MakeWriter<'a> for ScrubbingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = ScrubbingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbingWriter {
            inner: self.inner.make_writer(),
            scrubber: Arc::clone(&self.scrubber),
        }
    }
}

/// Writer handed out by [`ScrubbingMakeWriter`].
///
/// The fmt layer writes one complete event per `write` call, so each call is
/// scrubbed on its own.
pub struct ScrubbingWriter<W> {
    inner: W,
    scrubber: Arc<SecretScrubber>,
}

impl<W: io::Write> io::Write for ScrubbingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        let scrubbed = self.scrubber.scrub_message(&text);
        self.inner.write_all(scrubbed.as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
