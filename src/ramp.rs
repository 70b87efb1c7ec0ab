//! Settle time estimation for voltage setpoint changes.
//!
//! The supply moves toward a new setpoint at the configured ramp rate, in volts per second.
//! Ramp-up and ramp-down rates are separate channel parameters.

use fugit::SecsDurationU32;
use strum_macros::Display;
use thiserror::Error;

/// Fixed margin added on top of the computed ramp time before a setpoint is considered settled.
pub const SETTLE_MARGIN: SecsDurationU32 = SecsDurationU32::secs(2);

#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum RampDirection {
    #[strum(serialize = "ramp-up")]
    Up,
    #[strum(serialize = "ramp-down")]
    Down,
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[error("Division by zero {direction} rate")]
pub struct ZeroRampRate {
    pub direction: RampDirection,
}

/// Inputs for one setpoint change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampPlan {
    /// Requested setpoint, volts.
    pub target: f64,
    /// Monitored voltage before the change, volts.
    pub current: f64,
    /// Volts per second.
    pub ramp_up: f64,
    /// Volts per second.
    pub ramp_down: f64,
}

impl RampPlan {
    pub fn new(target: f64, current: f64, ramp_up: f64, ramp_down: f64) -> Self {
        Self {
            target,
            current,
            ramp_up,
            ramp_down,
        }
    }

    /// A change to the same voltage counts as a ramp down.
    pub fn direction(&self) -> RampDirection {
        if self.target > self.current {
            RampDirection::Up
        } else {
            RampDirection::Down
        }
    }

    /// Whole seconds the supply needs to reach the target.
    ///
    /// A rate that is not strictly positive cannot be divided by and yields [`ZeroRampRate`].
    pub fn ramp_time(&self) -> Result<SecsDurationU32, ZeroRampRate> {
        let direction = self.direction();
        let (delta, rate) = match direction {
            RampDirection::Up => (self.target - self.current, self.ramp_up),
            RampDirection::Down => (self.current - self.target, self.ramp_down),
        };
        if !(rate > 0.0) {
            return Err(ZeroRampRate { direction });
        }
        // `as` saturates, absurd deltas become u32::MAX seconds.
        Ok(SecsDurationU32::secs((delta / rate).ceil() as u32))
    }

    /// Ramp time plus [`SETTLE_MARGIN`].
    pub fn settle_time(&self) -> Result<SecsDurationU32, ZeroRampRate> {
        Ok(self.ramp_time()? + SETTLE_MARGIN)
    }
}

/// Convert a fugit duration for use with blocking sleeps.
pub(crate) fn to_std(duration: SecsDurationU32) -> std::time::Duration {
    std::time::Duration::from_secs(duration.to_secs() as u64)
}
