//! This crate provides an interface for controlling CAEN high voltage power supply crates.
//!
//! The vendor HV wrapper library is reached through the [`vendor::Connector`] and
//! [`vendor::Session`] traits, so any binding to it can be plugged in. On top of that the
//! [`HvController`] offers:
//! * a connection guard that opens a session for an operation and closes it again afterwards,
//! * a dispatch window during which the crate is left alone for an external party,
//! * ramp aware voltage setting which waits until the channel should have settled,
//! * checked parameter access, channel configuration and power switching,
//! * system, board and channel reports.
//!
//! Crate systems the vendor library supports, see [`SystemType`]:
//! * SY1527, SY2527
//! * SY4527, SY5527
//! * N568, N568E, V65XX, N1470, V8100
//! * DT55XX, DT55XXE, FTK, SMARTHV, NGPS, N1068, N1168, R6060
//!
//! With the `sim` feature an in-memory crate is available in [`sim`] for trying things out
//! without hardware.

pub mod channel_config;
pub mod clock;
pub mod config;
pub mod connection;
pub mod controller;
pub mod error;
pub mod param;
pub mod ramp;
pub mod report;
pub mod types;
pub mod vendor;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use channel_config::{ChannelConfig, ChannelConfigBuilder};
pub use config::ControllerConfig;
pub use controller::{AbortReason, HvController, RampOutcome};
pub use error::{Error, ParamLocation, Result};
pub use param::ChannelParam;
pub use types::{ChannelStatus, LinkType, ParamValue, SystemType};
