//! Mock transport for testing
//!
//! Captures outbound buffers and lets tests inject inbound chunks or a
//! session close through a cloneable [`MockHandle`].

use std::sync::Arc;

use async_trait::async_trait;
use gcs_core::{SessionInfo, TransportKind};
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{Transport, TransportError, TransportEvent};

#[derive(Default)]
struct MockShared {
    sent: Mutex<Vec<Vec<u8>>>,
}

/// Test-side handle to a [`MockTransport`]
#[derive(Clone)]
pub struct MockHandle {
    shared: Arc<MockShared>,
    events: mpsc::Sender<TransportEvent>,
}

impl MockHandle {
    /// Deliver inbound bytes as if they arrived from the vehicle.
    pub async fn inject(&self, bytes: &[u8]) {
        let _ = self.events.send(TransportEvent::Data(bytes.to_vec())).await;
    }

    /// Simulate the far end closing the session.
    pub async fn close(&self) {
        let _ = self.events.send(TransportEvent::Closed).await;
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.sent.lock().clone()
    }

    /// Drain the captured outbound buffers.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.shared.sent.lock())
    }
}

pub struct MockTransport {
    shared: Arc<MockShared>,
    events: mpsc::Sender<TransportEvent>,
}

impl MockTransport {
    pub fn new(events: mpsc::Sender<TransportEvent>) -> Self {
        Self {
            shared: Arc::new(MockShared::default()),
            events,
        }
    }

    pub fn handle(&self) -> MockHandle {
        MockHandle {
            shared: self.shared.clone(),
            events: self.events.clone(),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.shared.sent.lock().push(bytes.to_vec());
        Ok(())
    }

    async fn shutdown(&self) {}

    fn info(&self) -> SessionInfo {
        SessionInfo {
            kind: TransportKind::Mock,
            endpoint: "mock".to_string(),
        }
    }
}
