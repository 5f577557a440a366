//! Shared data models for the telemetry core

mod link;
mod log;
mod parameter;
mod vehicle;

pub use link::*;
pub use log::*;
pub use parameter::*;
pub use vehicle::*;
