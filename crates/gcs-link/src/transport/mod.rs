//! Transport adapters
//!
//! A transport owns the underlying handle (serial port, TCP stream or
//! listener, UDP socket) and pushes raw byte chunks plus lifecycle
//! events upward through an mpsc channel. The service's single event
//! loop drains that channel, which serializes all state mutation.

mod error;
pub mod mock;
mod serial;
mod tcp;
mod udp;

pub use error::TransportError;
pub use mock::{MockHandle, MockTransport};
pub use serial::SerialTransport;
pub use tcp::{TcpClientTransport, TcpServerTransport};
pub use udp::UdpTransport;

use async_trait::async_trait;
use gcs_core::SessionInfo;
use tokio::sync::mpsc;

use crate::config::TransportConfig;

/// Capacity of the transport → service event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Upstream notifications from a transport
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A raw chunk of received bytes, in arrival order
    Data(Vec<u8>),
    /// Non-fatal transport diagnostic
    Error(String),
    /// The session ended; the owner must clear vehicle state
    Closed,
}

/// Uniform read/write abstraction over the supported transports.
///
/// Received data is not polled through this trait; it arrives on the
/// event channel handed to the factory.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue an outbound buffer on the underlying handle.
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Tear down the underlying handle and background tasks. Idempotent.
    async fn shutdown(&self);

    /// Endpoint description of this session.
    fn info(&self) -> SessionInfo;
}

/// Open a transport for `config`, delivering events to `events`.
pub async fn connect_transport(
    config: &TransportConfig,
    events: mpsc::Sender<TransportEvent>,
) -> Result<Box<dyn Transport>, TransportError> {
    match config {
        TransportConfig::Serial(cfg) => Ok(Box::new(SerialTransport::open(cfg, events)?)),
        TransportConfig::TcpClient(cfg) => {
            Ok(Box::new(TcpClientTransport::connect(cfg, events).await?))
        }
        TransportConfig::TcpServer(cfg) => {
            Ok(Box::new(TcpServerTransport::listen(cfg, events).await?))
        }
        TransportConfig::Udp(cfg) => Ok(Box::new(UdpTransport::bind(cfg, events).await?)),
        TransportConfig::Mock(_) => Ok(Box::new(MockTransport::new(events))),
    }
}
