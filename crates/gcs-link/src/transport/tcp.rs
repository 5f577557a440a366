//! TCP transports: outbound client and single-peer server

use std::sync::Arc;

use async_trait::async_trait;
use gcs_core::{SessionInfo, TransportKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{Transport, TransportError, TransportEvent};
use crate::config::{TcpClientConfig, TcpServerConfig};

const READ_CHUNK: usize = 1024;

/// Outbound TCP connection. A peer close surfaces as `Closed` and the
/// owner clears vehicle state.
pub struct TcpClientTransport {
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    reader_handle: Mutex<Option<JoinHandle<()>>>,
    endpoint: String,
}

impl TcpClientTransport {
    pub async fn connect(
        config: &TcpClientConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.host, config.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{addr}: {e}")))?;
        info!(%addr, "TCP client connected");

        let (read_half, write_half) = stream.into_split();
        let handle = tokio::spawn(read_loop(read_half, events));

        Ok(Self {
            writer: Arc::new(Mutex::new(Some(write_half))),
            reader_handle: Mutex::new(Some(handle)),
            endpoint: addr,
        })
    }
}

async fn read_loop(mut read_half: tokio::net::tcp::OwnedReadHalf, events: mpsc::Sender<TransportEvent>) {
    let mut buf = [0u8; READ_CHUNK];
    loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                debug!("TCP peer closed the connection");
                let _ = events.send(TransportEvent::Closed).await;
                break;
            }
            Ok(n) => {
                if events
                    .send(TransportEvent::Data(buf[..n].to_vec()))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "TCP read failed");
                let _ = events.send(TransportEvent::Error(e.to_string())).await;
                let _ = events.send(TransportEvent::Closed).await;
                break;
            }
        }
    }
}

#[async_trait]
impl Transport for TcpClientTransport {
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::ConnectionClosed)?;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn shutdown(&self) {
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            kind: TransportKind::TcpClient,
            endpoint: self.endpoint.clone(),
        }
    }
}

/// Listening TCP endpoint that accepts exactly one peer.
///
/// A second concurrent peer is not supported by this design: the
/// listener stops accepting once a peer is live, and the session ends
/// when that peer disconnects (callers re-issue `connect` to listen
/// again).
pub struct TcpServerTransport {
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    accept_handle: Mutex<Option<JoinHandle<()>>>,
    endpoint: String,
}

impl TcpServerTransport {
    pub async fn listen(
        config: &TcpServerConfig,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Self, TransportError> {
        let bind = format!("{}:{}", config.bind_host, config.port);
        let listener = TcpListener::bind(&bind)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("bind {bind}: {e}")))?;
        info!(%bind, "TCP server listening");

        let writer: Arc<Mutex<Option<OwnedWriteHalf>>> = Arc::new(Mutex::new(None));
        let writer_slot = writer.clone();
        let handle = tokio::spawn(async move {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    info!(%peer, "TCP peer accepted");
                    let (read_half, write_half) = stream.into_split();
                    *writer_slot.lock().await = Some(write_half);
                    read_loop(read_half, events).await;
                    *writer_slot.lock().await = None;
                }
                Err(e) => {
                    warn!(error = %e, "TCP accept failed");
                    let _ = events.send(TransportEvent::Error(e.to_string())).await;
                    let _ = events.send(TransportEvent::Closed).await;
                }
            }
        });

        Ok(Self {
            writer,
            accept_handle: Mutex::new(Some(handle)),
            endpoint: bind,
        })
    }
}

#[async_trait]
impl Transport for TcpServerTransport {
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::ConnectionClosed)?;
        writer
            .write_all(bytes)
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn shutdown(&self) {
        if let Some(handle) = self.accept_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
    }

    fn info(&self) -> SessionInfo {
        SessionInfo {
            kind: TransportKind::TcpServer,
            endpoint: self.endpoint.clone(),
        }
    }
}
