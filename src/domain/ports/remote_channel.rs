//! Remote execution channel port.
//!
//! The channel itself (process launch, transport security) belongs to the
//! remote-execution layer. The core only needs a way to open a byte stream
//! to the remote side.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream to a remote execution context.
pub trait RemoteStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T> RemoteStream for T where T: AsyncRead + AsyncWrite + Unpin + Send {}

/// Opens streams to one remote execution context (e.g. a build agent).
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Human readable name of the remote side, for logs and errors.
    fn target(&self) -> String;

    /// Open a new stream. Callers bound this with a timeout.
    async fn connect(&self) -> std::io::Result<Box<dyn RemoteStream>>;
}
