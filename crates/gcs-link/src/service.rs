//! Link service: the operations facade over one transport session
//!
//! Owns the decoder, encoder, vehicle store and parameter session behind
//! a single mutex, and runs one event-loop task per session that drains
//! the transport channel. All state mutation happens on that task or
//! briefly under the mutex in an operation, so no finer locking is
//! needed.

use std::sync::Arc;
use std::time::Instant;

use gcs_core::{
    EventSink, GcsError, GcsResult, LinkStatus, LogMessage, ParameterList, ParameterProgress,
    SessionInfo, VehicleSnapshot,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::bus::{BroadcastSink, EventBus};
use crate::codec::{FrameDecoder, FrameEncoder, Message};
use crate::config::TransportConfig;
use crate::session::{ParameterSession, SetReply, SET_CONFIRM_TIMEOUT};
use crate::state::modes::flight_mode_name;
use crate::state::VehicleStateStore;
use crate::transport::{
    connect_transport, MockHandle, MockTransport, Transport, TransportEvent,
    EVENT_CHANNEL_CAPACITY,
};

/// System id this ground station claims on the link
pub const GCS_SYSTEM_ID: u8 = 255;
/// Component id this ground station claims on the link
pub const GCS_COMPONENT_ID: u8 = 190;

/// Autopilot component addressed by outbound requests
const AUTOPILOT_COMPONENT: u8 = 1;
/// MAV_CMD_COMPONENT_ARM_DISARM
const CMD_COMPONENT_ARM_DISARM: u16 = 400;
/// MAV_CMD_DO_SET_MODE
const CMD_DO_SET_MODE: u16 = 176;
/// MAV_MODE_FLAG_CUSTOM_MODE_ENABLED, passed as param1 of DO_SET_MODE
const MODE_FLAG_CUSTOM_MODE_ENABLED: f32 = 1.0;

/// Vehicle command verbs exposed by the command operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandAction {
    Arm,
    Disarm,
}

impl CommandAction {
    fn label(self) -> &'static str {
        match self {
            CommandAction::Arm => "Arm",
            CommandAction::Disarm => "Disarm",
        }
    }
}

struct ActiveLink {
    transport: Arc<dyn Transport>,
    session: SessionInfo,
    loop_handle: JoinHandle<()>,
    mock: Option<MockHandle>,
}

struct Inner {
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    store: VehicleStateStore,
    params: ParameterSession,
    link: Option<ActiveLink>,
}

impl Inner {
    fn status(&self) -> LinkStatus {
        LinkStatus {
            connected: self.link.is_some(),
            transport: self.link.as_ref().map(|l| l.session.kind),
            endpoint: self.link.as_ref().map(|l| l.session.endpoint.clone()),
            parameters_total: self.params.total(),
            parameters_received: self.params.received(),
            parameters_complete: self.params.complete(),
        }
    }

    /// First known vehicle, or the conventional autopilot system id
    /// before any heartbeat has been seen.
    fn target_system(&self) -> u8 {
        self.store.system_ids().first().copied().unwrap_or(1)
    }

    fn reset(&mut self) {
        self.decoder.reset();
        self.store.clear();
        self.params.reset();
    }
}

/// Facade over one transport session: connect/disconnect, telemetry
/// reads, parameter protocols, and vehicle commands.
pub struct LinkService {
    inner: Arc<Mutex<Inner>>,
    bus: Arc<EventBus>,
}

impl LinkService {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                decoder: FrameDecoder::new(),
                encoder: FrameEncoder::new(GCS_SYSTEM_ID, GCS_COMPONENT_ID),
                store: VehicleStateStore::new(),
                params: ParameterSession::new(),
                link: None,
            })),
            bus: Arc::new(EventBus::new(sink)),
        }
    }

    /// Service wired to a broadcast channel. The returned sink hands out
    /// subscriptions.
    pub fn with_broadcast(capacity: usize) -> (Self, Arc<BroadcastSink>) {
        let sink = Arc::new(BroadcastSink::new(capacity));
        (Self::new(sink.clone()), sink)
    }

    /// Open a transport session, replacing any existing one.
    pub async fn connect(&self, config: &TransportConfig) -> GcsResult<SessionInfo> {
        self.disconnect().await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (transport, mock): (Arc<dyn Transport>, Option<MockHandle>) = match config {
            TransportConfig::Mock(_) => {
                let t = MockTransport::new(tx);
                let handle = t.handle();
                (Arc::new(t), Some(handle))
            }
            other => {
                let t = connect_transport(other, tx)
                    .await
                    .map_err(|e| GcsError::ConnectionFailed(e.to_string()))?;
                (Arc::from(t), None)
            }
        };

        let session = transport.info();
        let loop_handle = tokio::spawn(event_loop(self.inner.clone(), self.bus.clone(), rx));

        let (status, log) = {
            let mut inner = self.inner.lock();
            inner.link = Some(ActiveLink {
                transport,
                session: session.clone(),
                loop_handle,
                mock,
            });
            let log = LogMessage::notice(
                0,
                format!("Connected via {} to {}", session.kind, session.endpoint),
            );
            inner.store.push_log(log.clone());
            (inner.status(), log)
        };
        info!(kind = %session.kind, endpoint = %session.endpoint, "Transport session opened");
        self.bus.publish_connection(status);
        self.bus.publish_message(log);
        Ok(session)
    }

    /// Tear down the session and clear all derived state. Safe to call
    /// with no session open.
    pub async fn disconnect(&self) -> GcsResult<()> {
        let link = {
            let mut inner = self.inner.lock();
            let link = inner.link.take();
            if link.is_some() {
                inner.reset();
            }
            link
        };
        let Some(link) = link else {
            return Ok(());
        };

        link.transport.shutdown().await;
        link.loop_handle.abort();
        info!(endpoint = %link.session.endpoint, "Transport session closed");
        self.bus.publish_connection(self.inner.lock().status());
        Ok(())
    }

    /// Ask the target vehicle to stream its full parameter list. Clears
    /// the registry so a restart never mixes downloads.
    pub async fn request_parameters(&self) -> GcsResult<String> {
        let (transport, bytes, progress) = {
            let mut inner = self.inner.lock();
            let link = inner.link.as_ref().ok_or(GcsError::NotConnected)?;
            let transport = link.transport.clone();
            let target = inner.target_system();
            inner.params.begin_download();
            let bytes = inner.encoder.param_request_list(target, 0);
            (transport, bytes, inner.params.progress())
        };
        transport.send(&bytes).await.map_err(GcsError::from)?;
        self.bus.publish_parameters(progress, true);
        Ok("Parameter list requested".to_string())
    }

    /// Stop tracking an in-flight download. Already-received values are
    /// kept; the vehicle keeps streaming but further progress is not
    /// reported.
    pub fn cancel_parameter_download(&self) -> ParameterProgress {
        let progress = {
            let mut inner = self.inner.lock();
            inner.params.cancel();
            inner.params.progress()
        };
        self.bus.publish_parameters(progress.clone(), true);
        progress
    }

    /// Write one parameter and wait for the vehicle to echo it back.
    pub async fn set_parameter(&self, name: &str, value: f32) -> GcsResult<f32> {
        if name.is_empty() || name.len() > 16 {
            return Err(GcsError::InvalidRequest(format!(
                "parameter name must be 1-16 bytes, got {:?}",
                name
            )));
        }
        if !value.is_finite() {
            return Err(GcsError::InvalidRequest(format!(
                "parameter value must be finite, got {value}"
            )));
        }

        let (transport, bytes, rx) = {
            let mut inner = self.inner.lock();
            let link = inner.link.as_ref().ok_or(GcsError::NotConnected)?;
            let transport = link.transport.clone();
            let target = inner.target_system();
            // INT32 for whole numbers, REAL32 otherwise; the vehicle
            // stores the value as float either way.
            let type_tag = if value.fract() == 0.0 { 6 } else { 9 };
            let bytes =
                inner
                    .encoder
                    .param_set(target, AUTOPILOT_COMPONENT, name, value, type_tag);
            let rx = inner.params.register_set(name.to_string(), value);
            (transport, bytes, rx)
        };
        transport.send(&bytes).await.map_err(GcsError::from)?;

        match tokio::time::timeout(SET_CONFIRM_TIMEOUT, rx).await {
            Ok(Ok(SetReply::Confirmed(v))) => Ok(v),
            Ok(Ok(SetReply::Mismatch(actual))) => Err(GcsError::ParameterMismatch {
                name: name.to_string(),
                expected: value,
                actual,
            }),
            // Sender dropped: superseded by a newer set or the session
            // was torn down. Either way there is no confirmation.
            Ok(Err(_)) => Err(GcsError::ParameterTimeout {
                name: name.to_string(),
                expected: value,
            }),
            Err(_) => {
                self.inner.lock().params.clear_expired_set(name);
                Err(GcsError::ParameterTimeout {
                    name: name.to_string(),
                    expected: value,
                })
            }
        }
    }

    /// Arm or disarm a vehicle. The target must exist and have reported
    /// within the liveness window.
    pub async fn send_command(&self, system_id: u8, action: CommandAction) -> GcsResult<String> {
        let (transport, bytes, log) = {
            let mut inner = self.inner.lock();
            let link = inner.link.as_ref().ok_or(GcsError::NotConnected)?;
            let transport = link.transport.clone();
            Self::check_commandable(&inner, system_id)?;

            let arm = if action == CommandAction::Arm { 1.0 } else { 0.0 };
            let bytes = inner.encoder.command_long(
                system_id,
                AUTOPILOT_COMPONENT,
                CMD_COMPONENT_ARM_DISARM,
                0,
                [arm, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
            );
            let text = format!("{} command sent to vehicle {system_id}", action.label());
            let log = LogMessage::notice(system_id, text);
            inner.store.push_log(log.clone());
            (transport, bytes, log)
        };
        transport.send(&bytes).await.map_err(GcsError::from)?;
        info!(system_id, action = action.label(), "Vehicle command sent");
        self.bus.publish_message(log.clone());
        Ok(log.text)
    }

    /// Request a flight mode change by ArduPilot custom-mode number.
    pub async fn set_flight_mode(&self, system_id: u8, mode: u32) -> GcsResult<String> {
        let (transport, bytes, log) = {
            let mut inner = self.inner.lock();
            let link = inner.link.as_ref().ok_or(GcsError::NotConnected)?;
            let transport = link.transport.clone();
            Self::check_commandable(&inner, system_id)?;

            let vehicle_type = inner
                .store
                .snapshot(system_id, Instant::now())
                .map(|v| v.vehicle_type)
                .unwrap_or(0);
            let mode_name = flight_mode_name(vehicle_type, mode);
            let bytes = inner.encoder.command_long(
                system_id,
                AUTOPILOT_COMPONENT,
                CMD_DO_SET_MODE,
                0,
                [
                    MODE_FLAG_CUSTOM_MODE_ENABLED,
                    mode as f32,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                    0.0,
                ],
            );
            let text = format!("Mode change to {mode_name} sent to vehicle {system_id}");
            let log = LogMessage::notice(system_id, text);
            inner.store.push_log(log.clone());
            (transport, bytes, log)
        };
        transport.send(&bytes).await.map_err(GcsError::from)?;
        info!(system_id, mode, "Flight mode change sent");
        self.bus.publish_message(log.clone());
        Ok(log.text)
    }

    fn check_commandable(inner: &Inner, system_id: u8) -> GcsResult<()> {
        if !inner.store.contains(system_id) {
            return Err(GcsError::UnknownVehicle(system_id));
        }
        if !inner.store.is_live(system_id, Instant::now()) {
            return Err(GcsError::VehicleNotResponding(system_id));
        }
        Ok(())
    }

    /// Snapshots of every known vehicle, liveness derived at call time.
    pub fn all_vehicles(&self) -> Vec<VehicleSnapshot> {
        self.inner.lock().store.snapshots(Instant::now())
    }

    pub fn vehicle(&self, system_id: u8) -> GcsResult<VehicleSnapshot> {
        self.inner
            .lock()
            .store
            .snapshot(system_id, Instant::now())
            .ok_or(GcsError::UnknownVehicle(system_id))
    }

    /// Every parameter received so far plus download bookkeeping.
    pub fn parameters(&self) -> ParameterList {
        self.inner.lock().params.list()
    }

    /// System log entries, newest first.
    pub fn messages(&self, system_id: Option<u8>, limit: Option<usize>) -> Vec<LogMessage> {
        self.inner
            .lock()
            .store
            .messages(system_id, limit.unwrap_or(50))
    }

    pub fn status(&self) -> LinkStatus {
        self.inner.lock().status()
    }

    /// Test-side handle when the active transport is the mock.
    pub fn mock_handle(&self) -> Option<MockHandle> {
        self.inner
            .lock()
            .link
            .as_ref()
            .and_then(|l| l.mock.clone())
    }
}

/// Drains one session's transport channel. Exits when the channel closes
/// or the session ends.
async fn event_loop(
    inner: Arc<Mutex<Inner>>,
    bus: Arc<EventBus>,
    mut events: mpsc::Receiver<TransportEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Data(chunk) => {
                let (snapshots, logs, progress) = {
                    let mut st = inner.lock();
                    let frames = st.decoder.push(&chunk);
                    let now = Instant::now();
                    let mut updated = false;
                    let mut logs = Vec::new();
                    let mut progress = None;
                    for frame in &frames {
                        if let Message::ParamValue(pv) = &frame.message {
                            st.params.apply_value(pv);
                            if st.params.reporting() {
                                progress =
                                    Some((st.params.progress(), st.params.complete()));
                            }
                        }
                        // Every frame also goes through the store so the
                        // sender's liveness is refreshed.
                        let result = st.store.apply(frame.system_id, &frame.message, now);
                        updated |= result.updated;
                        logs.extend(result.logs);
                    }
                    let snapshots = updated.then(|| st.store.snapshots(now));
                    (snapshots, logs, progress)
                };
                // Publish outside the lock; sinks may do arbitrary work.
                if let Some(snapshots) = snapshots {
                    bus.publish_vehicles(snapshots);
                }
                for log in logs {
                    bus.publish_message(log);
                }
                if let Some((progress, complete)) = progress {
                    bus.publish_parameters(progress, complete);
                }
            }
            TransportEvent::Error(message) => {
                warn!(error = %message, "Transport error");
                let log = LogMessage::from_wire(0, 3, format!("Link error: {message}"));
                inner.lock().store.push_log(log.clone());
                bus.publish_message(log);
            }
            TransportEvent::Closed => {
                let (transport, status) = {
                    let mut st = inner.lock();
                    let transport = st.link.take().map(|l| l.transport);
                    st.reset();
                    (transport, st.status())
                };
                if let Some(transport) = transport {
                    transport.shutdown().await;
                }
                info!("Transport session closed by remote end");
                bus.publish_connection(status);
                break;
            }
        }
    }
}
