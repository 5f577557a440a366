//! Event fan-out with per-channel rate limiting
//!
//! Vehicle snapshots and parameter progress are coalescing streams, so
//! they are throttled by minimum publish interval. Connection status and
//! log messages are discrete and always go out.

use std::sync::Arc;
use std::time::{Duration, Instant};

use gcs_core::{
    EventSink, GcsEvent, LinkStatus, LogMessage, ParameterProgress, VehicleSnapshot,
};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::trace;

/// Minimum interval between vehicle list publishes (10/s)
const VEHICLES_MIN_INTERVAL: Duration = Duration::from_millis(100);
/// Minimum interval between parameter progress publishes (2/s)
const PARAMETERS_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Throttled event channels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Vehicles,
    Parameters,
}

struct Limiter {
    last_vehicles: Option<Instant>,
    last_parameters: Option<Instant>,
}

impl Limiter {
    fn allow(&mut self, channel: Channel, now: Instant) -> bool {
        let (slot, interval) = match channel {
            Channel::Vehicles => (&mut self.last_vehicles, VEHICLES_MIN_INTERVAL),
            Channel::Parameters => (&mut self.last_parameters, PARAMETERS_MIN_INTERVAL),
        };
        match *slot {
            Some(last) if now.duration_since(last) < interval => false,
            _ => {
                *slot = Some(now);
                true
            }
        }
    }
}

/// Publishes [`GcsEvent`]s to an injected sink, dropping updates that
/// exceed a channel's rate cap. A dropped update is not queued; the next
/// allowed publish carries the current state.
pub struct EventBus {
    sink: Arc<dyn EventSink>,
    limiter: Mutex<Limiter>,
}

impl EventBus {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            sink,
            limiter: Mutex::new(Limiter {
                last_vehicles: None,
                last_parameters: None,
            }),
        }
    }

    /// Publish the full vehicle list, subject to the 10/s cap.
    pub fn publish_vehicles(&self, snapshots: Vec<VehicleSnapshot>) {
        if self.limiter.lock().allow(Channel::Vehicles, Instant::now()) {
            self.sink.publish(GcsEvent::VehiclesUpdate(snapshots));
        } else {
            trace!("Vehicle update dropped by rate cap");
        }
    }

    /// Publish parameter progress, subject to the 2/s cap. `force`
    /// bypasses the cap for terminal updates (complete, cancelled).
    pub fn publish_parameters(&self, progress: ParameterProgress, force: bool) {
        let allowed = force
            || self
                .limiter
                .lock()
                .allow(Channel::Parameters, Instant::now());
        if allowed {
            self.sink.publish(GcsEvent::ParametersUpdate(progress));
        } else {
            trace!("Parameter progress dropped by rate cap");
        }
    }

    /// Connection status changes are never throttled.
    pub fn publish_connection(&self, status: LinkStatus) {
        self.sink.publish(GcsEvent::ConnectionStatus(status));
    }

    /// Log messages are never throttled.
    pub fn publish_message(&self, message: LogMessage) {
        self.sink.publish(GcsEvent::SystemMessage(message));
    }
}

/// [`EventSink`] backed by a tokio broadcast channel, for callers that
/// want to subscribe rather than inject their own sink.
pub struct BroadcastSink {
    sender: broadcast::Sender<GcsEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GcsEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: GcsEvent) {
        // Errors only mean no subscriber is currently listening.
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CapturingSink {
        events: Mutex<Vec<GcsEvent>>,
    }

    impl EventSink for CapturingSink {
        fn publish(&self, event: GcsEvent) {
            self.events.lock().push(event);
        }
    }

    fn bus_with_sink() -> (EventBus, Arc<CapturingSink>) {
        let sink = Arc::new(CapturingSink::default());
        (EventBus::new(sink.clone()), sink)
    }

    #[test]
    fn burst_of_vehicle_updates_is_throttled_to_one() {
        let (bus, sink) = bus_with_sink();
        for _ in 0..20 {
            bus.publish_vehicles(vec![]);
        }
        assert_eq!(sink.events.lock().len(), 1);
    }

    #[test]
    fn parameter_progress_throttled_but_forced_terminal_passes() {
        let (bus, sink) = bus_with_sink();
        for i in 0..10 {
            bus.publish_parameters(ParameterProgress::new(10, i, false), false);
        }
        bus.publish_parameters(ParameterProgress::new(10, 10, true), true);
        let events = sink.events.lock();
        assert_eq!(events.len(), 2);
        match &events[1] {
            GcsEvent::ParametersUpdate(p) => assert!(p.complete),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn messages_and_status_never_throttled() {
        let (bus, sink) = bus_with_sink();
        for i in 0..5 {
            bus.publish_message(LogMessage::notice(1, format!("msg {i}")));
            bus.publish_connection(LinkStatus {
                connected: true,
                transport: None,
                endpoint: None,
                parameters_total: 0,
                parameters_received: 0,
                parameters_complete: false,
            });
        }
        assert_eq!(sink.events.lock().len(), 10);
    }

    #[test]
    fn broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new(16);
        let mut rx = sink.subscribe();
        sink.publish(GcsEvent::SystemMessage(LogMessage::notice(1, "hello")));
        match rx.try_recv().unwrap() {
            GcsEvent::SystemMessage(m) => assert_eq!(m.text, "hello"),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
