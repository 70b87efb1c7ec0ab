//! Our error types for the HV crate controller.

use std::time::SystemTime;

use strum_macros::Display;
use thiserror::Error;

use crate::{ramp::ZeroRampRate, types::ParamMode};

pub type Result<T, E> = core::result::Result<T, Error<E>>;

/// Structured error codes a vendor library may attach to its errors.
///
/// Only the codes this crate acts upon are listed, anything else is [`VendorErrorCode::Other`].
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum VendorErrorCode {
    /// The session is not (or no longer) connected.
    NotConnected,
    /// The link to the crate could not be established or was lost.
    ConnectionFailed,
    /// The crate front-end server is down.
    ServerDown,
    /// Any other failure.
    Other,
}

/// Implemented by the error type of a vendor [`Session`](crate::vendor::Session).
pub trait VendorError: std::error::Error + 'static {
    /// The structured code for this error, if the vendor provides one.
    fn code(&self) -> Option<VendorErrorCode> {
        None
    }
}

/// Custom error type for crate controller operations.
#[derive(Error, Debug)]
pub enum Error<E: VendorError> {
    #[error("Failed to connect to the HV crate: {0}")]
    ConnectFailure(#[source] E),
    #[error("Crate is dispatched until {until:?}; cannot re-open now")]
    Dispatched { until: SystemTime },
    #[error("No open session")]
    NotConnected,
    #[error("No board in slot {slot}")]
    NoSuchBoard { slot: u16 },
    #[error("No channel {channel} in slot {slot}")]
    NoSuchChannel { slot: u16, channel: u16 },
    #[error("Parameter {name} not found for {location}")]
    ParamNotFound { location: ParamLocation, name: String },
    #[error("Parameter {name} of {location} is {mode}")]
    ParamModeViolation {
        location: ParamLocation,
        name: String,
        mode: ParamMode,
    },
    #[error("Vendor read failed: {0}")]
    ReadFailure(#[source] E),
    #[error("Vendor write failed: {0}")]
    WriteFailure(#[source] E),
    #[error("Voltage setpoint {target} is not a finite number")]
    NonFiniteSetpoint { target: f64 },
    #[error(transparent)]
    DivideByZeroRampRate(#[from] ZeroRampRate),
    #[error("Parameter {name} of {location} holds an unexpected value")]
    UnexpectedValue { location: ParamLocation, name: String },
}

/// Where a parameter lives, used for error reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    System,
    Board { slot: u16 },
    Channel { slot: u16, channel: u16 },
}

impl core::fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamLocation::System => write!(f, "system"),
            ParamLocation::Board { slot } => write!(f, "slot {slot}"),
            ParamLocation::Channel { slot, channel } => write!(f, "slot {slot} ch {channel}"),
        }
    }
}
