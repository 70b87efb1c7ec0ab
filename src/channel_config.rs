use thiserror::Error;

use crate::{param::ChannelParam, types::ParamValue};

/// A complete set of channel limits and options. Use [`ChannelConfigBuilder`] to create one.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Voltage setpoint, volts.
    v0_set: f64,
    /// Current limit, microamps.
    i0_set: f64,
    v1_set: f64,
    i1_set: f64,
    /// Restore the previous state when the crate powers up.
    power_on_restore: bool,
    /// Kill instead of ramping down on trip.
    power_down_kill: bool,
    /// Volts per second.
    ramp_up: f64,
    /// Volts per second.
    ramp_down: f64,
    /// Seconds.
    trip_time: f64,
    /// Software voltage limit, volts.
    sv_max: f64,
    im_range: f64,
    zc_detect: bool,
    zc_adjust: bool,
}

impl ChannelConfig {
    /// The parameter writes for this configuration, in the order they are applied.
    pub fn writes(&self) -> [(ChannelParam, ParamValue); 13] {
        use ChannelParam as CP;

        [
            (CP::V0Set, self.v0_set.into()),
            (CP::I0Set, self.i0_set.into()),
            (CP::V1Set, self.v1_set.into()),
            (CP::I1Set, self.i1_set.into()),
            (CP::POn, self.power_on_restore.into()),
            (CP::PDwn, self.power_down_kill.into()),
            (CP::RUp, self.ramp_up.into()),
            (CP::RDWn, self.ramp_down.into()),
            (CP::Trip, self.trip_time.into()),
            (CP::SVMax, self.sv_max.into()),
            (CP::ImRange, self.im_range.into()),
            (CP::ZCDetect, self.zc_detect.into()),
            (CP::ZCAdjust, self.zc_adjust.into()),
        ]
    }

    pub fn v0_set(&self) -> f64 {
        self.v0_set
    }

    pub fn i0_set(&self) -> f64 {
        self.i0_set
    }
}

/// Use this type to create a channel configuration.
///
/// Unset options take the values the crate ships with.
#[derive(Debug, Clone)]
pub struct ChannelConfigBuilder {
    config: ChannelConfig,
}

impl ChannelConfigBuilder {
    pub fn new(v0_set: f64, i0_set: f64) -> Self {
        ChannelConfigBuilder {
            config: ChannelConfig {
                v0_set,
                i0_set,
                v1_set: 0.0,
                i1_set: 1010.0,
                power_on_restore: false,
                power_down_kill: false,
                ramp_up: 20.0,
                ramp_down: 20.0,
                trip_time: 10.0,
                sv_max: 1000.0,
                im_range: 0.0,
                zc_detect: true,
                zc_adjust: false,
            },
        }
    }

    /// Check the values and build.
    pub fn build(self) -> Result<ChannelConfig, ChannelConfigError> {
        let c = &self.config;
        for (name, value) in [
            ("V0Set", c.v0_set),
            ("I0Set", c.i0_set),
            ("V1Set", c.v1_set),
            ("I1Set", c.i1_set),
            ("Trip", c.trip_time),
            ("SVMax", c.sv_max),
        ] {
            if !(value >= 0.0) {
                return Err(ChannelConfigError::Negative { name, value });
            }
        }
        for (name, value) in [("RUp", c.ramp_up), ("RDWn", c.ramp_down)] {
            if !(value > 0.0) {
                return Err(ChannelConfigError::InvalidRampRate { name, value });
            }
        }
        if c.v0_set > c.sv_max {
            return Err(ChannelConfigError::AboveSoftLimit {
                v0_set: c.v0_set,
                sv_max: c.sv_max,
            });
        }
        Ok(self.config)
    }

    /// Set the second voltage setpoint and current limit.
    pub fn with_secondary(mut self, v1_set: f64, i1_set: f64) -> Self {
        self.config.v1_set = v1_set;
        self.config.i1_set = i1_set;
        self
    }

    /// Set ramp-up and ramp-down rates, volts per second.
    pub fn with_ramp(mut self, up: f64, down: f64) -> Self {
        self.config.ramp_up = up;
        self.config.ramp_down = down;
        self
    }

    /// Restore the previous state when the crate powers up.
    pub fn with_power_on_restore(mut self, restore: bool) -> Self {
        self.config.power_on_restore = restore;
        self
    }

    /// Kill the output instead of ramping down when tripped.
    pub fn with_power_down_kill(mut self, kill: bool) -> Self {
        self.config.power_down_kill = kill;
        self
    }

    /// Set trip time in seconds.
    pub fn with_trip_time(mut self, seconds: f64) -> Self {
        self.config.trip_time = seconds;
        self
    }

    /// Set the software voltage limit.
    pub fn with_sv_max(mut self, volts: f64) -> Self {
        self.config.sv_max = volts;
        self
    }

    pub fn with_im_range(mut self, range: f64) -> Self {
        self.config.im_range = range;
        self
    }

    pub fn with_zero_current(mut self, detect: bool, adjust: bool) -> Self {
        self.config.zc_detect = detect;
        self.config.zc_adjust = adjust;
        self
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ChannelConfigError {
    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
    #[error("{name} must be a positive rate, got {value}")]
    InvalidRampRate { name: &'static str, value: f64 },
    #[error("V0Set {v0_set} is above SVMax {sv_max}")]
    AboveSoftLimit { v0_set: f64, sv_max: f64 },
}
