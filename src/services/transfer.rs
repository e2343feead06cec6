//! Delivery of detached credentials to a remote execution context.
//!
//! The sending side connects through a [`RemoteConnector`], performs the
//! handshake and sends one envelope. Each phase runs under its own timeout
//! from [`RemoteConfig`]. Failures are returned to the caller as they are;
//! nothing here retries.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::adapters::remote::{FrameType, FramedChannel, WireEnvelope};
use crate::domain::errors::RemoteTransferError;
use crate::domain::models::config::RemoteConfig;
use crate::domain::models::snapshot::DetachedCredential;
use crate::domain::ports::{RemoteConnector, SecretCodec};
use crate::infrastructure::logging::{AuditEventType, AuditLogger};

/// Sends detached credentials over a remote channel.
pub struct CredentialTransfer {
    connector: Arc<dyn RemoteConnector>,
    codec: Arc<dyn SecretCodec>,
    config: RemoteConfig,
    audit: AuditLogger,
}

impl CredentialTransfer {
    pub fn new(
        connector: Arc<dyn RemoteConnector>,
        codec: Arc<dyn SecretCodec>,
        config: RemoteConfig,
    ) -> Self {
        Self {
            connector,
            codec,
            config,
            audit: AuditLogger::disabled(),
        }
    }

    #[must_use]
    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = audit;
        self
    }

    /// Send one credential. Returns the id acknowledged by the peer.
    #[instrument(skip_all, fields(id = %credential.id(), target = %self.connector.target()))]
    pub async fn send(&self, credential: &DetachedCredential) -> Result<String, RemoteTransferError> {
        let result = self.deliver(credential).await;
        match &result {
            Ok(_) => info!("credential delivered"),
            Err(e) => warn!(error = %e, "credential transfer failed"),
        }
        self.audit.record(
            AuditEventType::CredentialTransferred,
            "transfer",
            Some(credential.id()),
            result.is_ok(),
            Some(serde_json::json!({ "target": self.connector.target() })),
        );
        result
    }

    async fn deliver(&self, credential: &DetachedCredential) -> Result<String, RemoteTransferError> {
        let envelope = WireEnvelope::encode(credential, self.codec.as_ref())?;

        let connect_ms = self.config.connect_timeout_ms;
        let stream = timeout(Duration::from_millis(connect_ms), self.connector.connect())
            .await
            .map_err(|_| RemoteTransferError::ConnectTimeout(connect_ms))?
            .map_err(|e| RemoteTransferError::Unavailable(e.to_string()))?;
        let mut channel = FramedChannel::new(stream, self.config.max_frame_bytes);

        let handshake_ms = self.config.handshake_timeout_ms;
        bounded(handshake_ms, channel.client_handshake(), RemoteTransferError::HandshakeTimeout).await?;

        let transfer_ms = self.config.transfer_timeout_ms;
        let acknowledged = bounded(
            transfer_ms,
            channel.send_credential(&envelope),
            RemoteTransferError::TransferTimeout,
        )
        .await?;

        if acknowledged != credential.id() {
            return Err(RemoteTransferError::Protocol(format!(
                "peer acknowledged '{acknowledged}' instead of '{}'",
                credential.id()
            )));
        }
        Ok(acknowledged)
    }
}

/// Receiving side of the exchange, as run by the remote execution context.
///
/// Decoded secrets are sealed under the receiver's own codec.
pub struct CredentialReceiver {
    codec: Arc<dyn SecretCodec>,
    config: RemoteConfig,
}

impl CredentialReceiver {
    pub fn new(codec: Arc<dyn SecretCodec>, config: RemoteConfig) -> Self {
        Self { codec, config }
    }

    /// Accept one credential from `stream`, acknowledging or rejecting it.
    #[instrument(skip_all)]
    pub async fn receive<S>(&self, stream: S) -> Result<DetachedCredential, RemoteTransferError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut channel = FramedChannel::new(stream, self.config.max_frame_bytes);
        bounded(
            self.config.handshake_timeout_ms,
            channel.server_handshake(),
            RemoteTransferError::HandshakeTimeout,
        )
        .await?;

        let frame = bounded(
            self.config.transfer_timeout_ms,
            channel.recv(),
            RemoteTransferError::TransferTimeout,
        )
        .await?;
        if frame.kind != FrameType::Credential {
            let reason = format!("expected CREDENTIAL frame, got {:?}", frame.kind);
            channel.send(FrameType::Rejected, reason.as_bytes()).await?;
            return Err(RemoteTransferError::Protocol(reason));
        }

        match WireEnvelope::decode(&frame.payload, self.codec.as_ref()) {
            Ok(credential) => {
                channel
                    .send(FrameType::Received, credential.id().as_bytes())
                    .await?;
                info!(id = %credential.id(), "credential received");
                Ok(credential)
            }
            Err(e) => {
                channel
                    .send(FrameType::Rejected, e.to_string().as_bytes())
                    .await?;
                warn!(error = %e, "rejected credential envelope");
                Err(e.into())
            }
        }
    }
}

async fn bounded<T, F>(
    millis: u64,
    operation: F,
    on_timeout: fn(u64) -> RemoteTransferError,
) -> Result<T, RemoteTransferError>
where
    F: Future<Output = Result<T, RemoteTransferError>>,
{
    timeout(Duration::from_millis(millis), operation)
        .await
        .map_err(|_| on_timeout(millis))?
}
