//! Remote transfer adapters: the credential envelope, channel framing and
//! stream connectors.

pub mod stream_channel;
pub mod wire;

#[cfg(unix)]
mod unix_connector;

pub use stream_channel::{Frame, FrameType, FramedChannel, PROTOCOL_VERSION};
#[cfg(unix)]
pub use unix_connector::UnixSocketConnector;
pub use wire::{WireEnvelope, ENVELOPE_MAGIC, ENVELOPE_VERSION};
