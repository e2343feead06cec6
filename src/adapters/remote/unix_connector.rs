//! Connector for a channel proxy listening on a Unix domain socket.
//!
//! The proxy (e.g. the agent launcher's forwarder) owns transport security;
//! this side only opens the local socket.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::net::UnixStream;

use crate::domain::ports::{RemoteConnector, RemoteStream};

#[derive(Debug, Clone)]
pub struct UnixSocketConnector {
    socket_path: PathBuf,
}

impl UnixSocketConnector {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }
}

#[async_trait]
impl RemoteConnector for UnixSocketConnector {
    fn target(&self) -> String {
        format!("unix:{}", self.socket_path.display())
    }

    async fn connect(&self) -> std::io::Result<Box<dyn RemoteStream>> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        Ok(Box::new(stream))
    }
}
