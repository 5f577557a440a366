//! gcs-core - Shared models and event types for the GCS telemetry core
//!
//! This crate provides the data model that the protocol core (`gcs-link`)
//! maintains and the external routing layer consumes: vehicle snapshots,
//! parameters, system log messages, link status, and the published event
//! enum together with the `EventSink` trait that decouples the core from
//! any concrete subscriber delivery mechanism.

pub mod error;
pub mod events;
pub mod models;

pub use error::{GcsError, GcsResult};
pub use events::{EventSink, GcsEvent, NullSink, ParameterProgress};
pub use models::*;
