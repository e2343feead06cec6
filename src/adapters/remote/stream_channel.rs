//! Length-prefixed framing over a remote byte stream.
//!
//! Frame: `[type u8][len u32 BE][payload]`.
//!
//! Exchange, initiated by the sending side:
//!
//! ```text
//! HELLO(version)        ->
//!                       <- HELLO_ACK(version) | REJECTED(reason)
//! CREDENTIAL(envelope)  ->
//!                       <- RECEIVED(id) | REJECTED(reason)
//! ```

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use zeroize::Zeroizing;

use crate::domain::errors::RemoteTransferError;

pub const PROTOCOL_VERSION: u8 = 1;

const FRAME_HEADER_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Hello = 1,
    HelloAck = 2,
    Credential = 3,
    Received = 4,
    Rejected = 5,
}

impl FrameType {
    const fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Self::Hello),
            2 => Some(Self::HelloAck),
            3 => Some(Self::Credential),
            4 => Some(Self::Received),
            5 => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// One received frame. The payload may hold an envelope with plaintext
/// secrets and is wiped on drop.
pub struct Frame {
    pub kind: FrameType,
    pub payload: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("kind", &self.kind)
            .field("payload", &format_args!("[REDACTED; {} bytes]", self.payload.len()))
            .finish()
    }
}

impl Frame {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

pub struct FramedChannel<S> {
    stream: S,
    max_frame_bytes: u32,
}

impl<S> FramedChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub const fn new(stream: S, max_frame_bytes: u32) -> Self {
        Self {
            stream,
            max_frame_bytes,
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub async fn send(&mut self, kind: FrameType, payload: &[u8]) -> Result<(), RemoteTransferError> {
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= self.max_frame_bytes)
            .ok_or_else(|| {
                RemoteTransferError::Protocol(format!(
                    "outgoing frame of {} bytes exceeds limit of {} bytes",
                    payload.len(),
                    self.max_frame_bytes
                ))
            })?;
        let mut header = [0u8; FRAME_HEADER_LEN];
        header[0] = kind as u8;
        header[1..].copy_from_slice(&len.to_be_bytes());
        self.stream.write_all(&header).await?;
        self.stream.write_all(payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    pub async fn recv(&mut self) -> Result<Frame, RemoteTransferError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        self.stream.read_exact(&mut header).await?;
        let kind = FrameType::from_u8(header[0]).ok_or_else(|| {
            RemoteTransferError::Protocol(format!("unknown frame type {}", header[0]))
        })?;
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
        if len > self.max_frame_bytes {
            return Err(RemoteTransferError::Protocol(format!(
                "incoming frame of {len} bytes exceeds limit of {} bytes",
                self.max_frame_bytes
            )));
        }
        let mut payload = Zeroizing::new(vec![0u8; len as usize]);
        self.stream.read_exact(&mut payload).await?;
        Ok(Frame { kind, payload })
    }

    /// Sending side of the handshake.
    pub async fn client_handshake(&mut self) -> Result<(), RemoteTransferError> {
        self.send(FrameType::Hello, &[PROTOCOL_VERSION]).await?;
        let reply = self.recv().await?;
        match reply.kind {
            FrameType::HelloAck if reply.payload.as_slice() == [PROTOCOL_VERSION] => Ok(()),
            FrameType::HelloAck => Err(RemoteTransferError::Protocol(format!(
                "peer acknowledged unexpected protocol version {:?}",
                reply.payload.as_slice()
            ))),
            FrameType::Rejected => Err(RemoteTransferError::Rejected(reply.text())),
            other => Err(unexpected(other, "HELLO_ACK")),
        }
    }

    /// Receiving side of the handshake. Rejects other protocol versions.
    pub async fn server_handshake(&mut self) -> Result<(), RemoteTransferError> {
        let hello = self.recv().await?;
        if hello.kind != FrameType::Hello {
            return Err(unexpected(hello.kind, "HELLO"));
        }
        if hello.payload.as_slice() != [PROTOCOL_VERSION] {
            let reason = format!(
                "unsupported protocol version {:?}, expected {PROTOCOL_VERSION}",
                hello.payload.as_slice()
            );
            self.send(FrameType::Rejected, reason.as_bytes()).await?;
            return Err(RemoteTransferError::Protocol(reason));
        }
        self.send(FrameType::HelloAck, &[PROTOCOL_VERSION]).await
    }

    /// Send an envelope and wait for the peer's verdict. Returns the id the
    /// peer acknowledged.
    pub async fn send_credential(&mut self, envelope: &[u8]) -> Result<String, RemoteTransferError> {
        self.send(FrameType::Credential, envelope).await?;
        let reply = self.recv().await?;
        match reply.kind {
            FrameType::Received => Ok(reply.text()),
            FrameType::Rejected => Err(RemoteTransferError::Rejected(reply.text())),
            other => Err(unexpected(other, "RECEIVED")),
        }
    }
}

fn unexpected(got: FrameType, expected: &str) -> RemoteTransferError {
    RemoteTransferError::Protocol(format!("expected {expected} frame, got {got:?}"))
}
