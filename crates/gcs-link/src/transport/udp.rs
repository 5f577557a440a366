//! UDP transport
//!
//! Binds a local endpoint. The remote peer is either configured
//! explicitly or learned from the source address of the first inbound
//! datagram; sends before a peer is known fail cleanly.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use gcs_core::{SessionInfo, TransportKind};
use parking_lot::RwLock;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::{Transport, TransportError, TransportEvent};
use crate::config::UdpConfig;

const READ_CHUNK: usize = 2048;

pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peer: Arc<RwLock<Option<SocketAddr>>>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    endpoint: String,
}

impl UdpTransport {
    pub async fn bind(
        config: &UdpConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let bind = format!("{}:{}", config.bind_host, config.bind_port);
        let socket = UdpSocket::bind(&bind)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("bind {bind}: {e}")))?;
        let socket = Arc::new(socket);

        let peer = Arc::new(RwLock::new(None));
        if let Some(remote) = &config.remote {
            let addr: SocketAddr = remote
                .parse()
                .map_err(|e| TransportError::InvalidConfig(format!("remote {remote}: {e}")))?;
            *peer.write() = Some(addr);
        }
        info!(%bind, remote = ?config.remote, "UDP socket bound");

        let handle = tokio::spawn(recv_loop(socket.clone(), peer.clone(), events));

        Ok(Self {
            socket,
            peer,
            reader_handle: Mutex::new(Some(handle)),
            endpoint: bind,
        })
    }
}

async fn recv_loop(
    socket: Arc<UdpSocket>,
    peer: Arc<RwLock<Option<SocketAddr>>>,
    events: mpsc::Sender<TransportEvent>,
) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match socket.recv_from(&mut buf).await {
            Ok((n, from)) => {
                if peer.read().is_none() {
                    info!(%from, "Learned UDP peer from first inbound datagram");
                    *peer.write() = Some(from);
                }
                if events
                    .send(TransportEvent::Data(buf[..n].to_vec()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "UDP receive failed");
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                let _ = events.send(TransportEvent::Closed).await;
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let target = self.peer.read().ok_or(TransportError::NoPeer)?;
        self.socket
            .send_to(bytes, target)
            .await
            .map(|_| ())
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn shutdown(&self) {
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            kind: TransportKind::Udp,
            endpoint: self.endpoint.clone(),
        }
    }
}
