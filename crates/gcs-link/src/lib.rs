//! gcs-link - MAVLink telemetry and command core for the ground station
//!
//! This crate owns the binary frame codec, the transport adapters, the
//! per-vehicle state registry and the parameter protocols, and exposes
//! them through a single [`LinkService`] facade.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      LinkService                            │
//! │  Operations facade (connect, telemetry, params, commands)   │
//! │                                                             │
//! │  ┌─────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │VehicleState │  │ParameterSess │  │EventBus           │  │
//! │  │Store        │  │(download/set)│  │(throttled fan-out)│  │
//! │  └─────────────┘  └──────────────┘  └───────────────────┘  │
//! │                          │                                  │
//! │                  ┌───────┴───────┐                          │
//! │                  │ FrameDecoder/ │                          │
//! │                  │ FrameEncoder  │                          │
//! │                  └───────┬───────┘                          │
//! │                          │                                  │
//! │                 ┌────────┴────────┐                         │
//! │                 │   Transport     │                         │
//! │                 │(serial/TCP/UDP) │                         │
//! │                 └─────────────────┘                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Inbound bytes flow up through one mpsc channel per session; a single
//! event-loop task decodes them and mutates state, so every operation
//! observes frames in arrival order.

pub mod bus;
pub mod codec;
pub mod config;
pub mod service;
pub mod session;
pub mod state;
pub mod transport;

pub use bus::{BroadcastSink, EventBus};
pub use codec::{Frame, FrameDecoder, FrameEncoder, Message};
pub use config::{
    MockConfig, SerialConfig, TcpClientConfig, TcpServerConfig, TransportConfig, UdpConfig,
    UsbDescriptor,
};
pub use service::{CommandAction, LinkService, GCS_COMPONENT_ID, GCS_SYSTEM_ID};
pub use session::{ParameterSession, SET_CONFIRM_TIMEOUT};
pub use state::{VehicleStateStore, LIVENESS_WINDOW};
pub use transport::{
    connect_transport, MockHandle, MockTransport, Transport, TransportError, TransportEvent,
};

// Re-export for convenience
pub use gcs_core::{
    EventSink, GcsError, GcsEvent, GcsResult, LinkStatus, LogMessage, Parameter, ParameterList,
    ParameterProgress, SessionInfo, TransportKind, VehicleSnapshot,
};
