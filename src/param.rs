//! This module is used to name the channel parameters of the HV boards.
//!
//! The controller accepts any `AsRef<str>` as a parameter name, these are the ones it uses itself.

use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

#[derive(Debug, Copy, Clone, PartialEq, Eq, AsRefStr, Display, EnumIter, EnumString)]
pub enum ChannelParam {
    /// __R/W__ - Voltage setpoint, the value the channel ramps toward. Volts.
    V0Set,
    /// __R/W__ - Current limit. Microamps.
    I0Set,
    /// __R/W__ - Second voltage setpoint.
    V1Set,
    /// __R/W__ - Second current limit.
    I1Set,
    /// __R/W__ - Ramp-up rate. Volts per second.
    RUp,
    /// __R/W__ - Ramp-down rate. Volts per second.
    RDWn,
    /// __R/W__ - Trip time. Seconds.
    Trip,
    /// __R/W__ - Software voltage limit.
    SVMax,
    /// __R__ - Monitored voltage.
    VMon,
    /// __R__ - Monitored current.
    IMon,
    /// __R__ - Channel status word.
    ///
    /// See [`ChannelStatus`](crate::types::ChannelStatus).
    Status,
    /// __R__ - Board temperature.
    Temp,
    /// __R/W__ - Power on/off.
    Pw,
    /// __R/W__ - Power-on option: restore the previous state when the crate powers up.
    POn,
    /// __R/W__ - Power-down option: ramp down or kill when tripped.
    PDwn,
    /// __R/W__ - Internal trip connections.
    TripInt,
    /// __R/W__ - External trip connections.
    TripExt,
    /// __R/W__ - Current monitor range.
    ImRange,
    /// __R/W__ - Zero current detection.
    ZCDetect,
    /// __R/W__ - Zero current adjust.
    ZCAdjust,
    /// __R/W__ - Enable control.
    EnCtr,
}

/// Parameters shown by default in channel reports.
pub const DEFAULT_CHANNEL_REPORT: [ChannelParam; 7] = [
    ChannelParam::V0Set,
    ChannelParam::I0Set,
    ChannelParam::VMon,
    ChannelParam::IMon,
    ChannelParam::Status,
    ChannelParam::Pw,
    ChannelParam::Temp,
];
