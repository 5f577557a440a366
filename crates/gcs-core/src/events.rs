//! Published event types and the subscriber seam
//!
//! The protocol core publishes state-change notifications through an
//! injected [`EventSink`] rather than owning a delivery mechanism, so
//! tests can substitute a capturing sink for a real fan-out channel.

use serde::{Deserialize, Serialize};

use crate::models::{LinkStatus, LogMessage, VehicleSnapshot};

/// Parameter download progress, as published to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterProgress {
    pub total: u16,
    pub received: usize,
    pub complete: bool,
    /// Received/total as a whole percentage (0 while total is unknown)
    pub progress_pct: u8,
}

impl ParameterProgress {
    pub fn new(total: u16, received: usize, complete: bool) -> Self {
        let progress_pct = if total > 0 {
            ((received as f64 / total as f64) * 100.0).min(100.0) as u8
        } else {
            0
        };
        Self {
            total,
            received,
            complete,
            progress_pct,
        }
    }
}

/// Notifications fanned out to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum GcsEvent {
    /// Full vehicle list, throttled to at most 10/s
    VehiclesUpdate(Vec<VehicleSnapshot>),
    /// Transport session opened/closed, never throttled
    ConnectionStatus(LinkStatus),
    /// One system log message, never throttled
    SystemMessage(LogMessage),
    /// Parameter download progress, throttled to at most 2/s
    ParametersUpdate(ParameterProgress),
}

/// Destination for published events.
///
/// Implementations must be cheap and non-blocking; the core calls
/// `publish` from its event loop.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: GcsEvent);
}

/// Sink that drops every event. Useful for headless use and tests that
/// do not observe notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: GcsEvent) {}
}
