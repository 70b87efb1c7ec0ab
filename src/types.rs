//! This module contains the types exchanged with the vendor HV wrapper.

use modular_bitfield::prelude::*;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The crate families the vendor wrapper can talk to.
#[derive(Debug, Display, EnumIter, EnumString, IntoStaticStr, PartialEq, Eq, Clone, Copy)]
pub enum SystemType {
    SY1527,
    SY2527,
    SY4527,
    SY5527,
    N568,
    V65XX,
    N1470,
    V8100,
    N568E,
    DT55XX,
    FTK,
    DT55XXE,
    N1068,
    SMARTHV,
    NGPS,
    N1168,
    R6060,
}

impl Default for SystemType {
    fn default() -> Self {
        SystemType::SY4527
    }
}

/// The physical links the vendor wrapper can open.
#[allow(non_camel_case_types)]
#[derive(Debug, Display, EnumIter, EnumString, IntoStaticStr, PartialEq, Eq, Clone, Copy)]
pub enum LinkType {
    TCPIP,
    RS232,
    CAENET,
    USB,
    OPTLINK,
    USB_VCP,
    USB3,
    A4818,
}

impl Default for LinkType {
    fn default() -> Self {
        LinkType::TCPIP
    }
}

/// Access mode of a parameter or system property.
#[derive(Debug, Display, PartialEq, Eq, Clone, Copy)]
pub enum ParamMode {
    #[strum(serialize = "read-only")]
    ReadOnly,
    #[strum(serialize = "write-only")]
    WriteOnly,
    #[strum(serialize = "read-write")]
    ReadWrite,
}

impl ParamMode {
    pub fn is_readable(&self) -> bool {
        !matches!(self, ParamMode::WriteOnly)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, ParamMode::ReadOnly)
    }
}

/// Value type of a parameter as reported by the vendor.
#[derive(Debug, Display, EnumIter, PartialEq, Eq, Clone, Copy)]
pub enum ParamType {
    Numeric,
    OnOff,
    ChStatus,
    BdStatus,
    Binary,
    String,
    Enum,
}

/// Mode and type metadata of one parameter.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct ParamProp {
    pub param_type: ParamType,
    pub mode: ParamMode,
}

impl ParamProp {
    pub const fn new(param_type: ParamType, mode: ParamMode) -> Self {
        Self { param_type, mode }
    }
}

/// A parameter value as mirrored from the vendor.
#[derive(Debug, PartialEq, Clone)]
pub enum ParamValue {
    Numeric(f64),
    OnOff(bool),
    /// Raw channel or board status word.
    Status(u32),
    Binary(u32),
    Text(String),
}

impl ParamValue {
    /// Numeric view of the value. Status, binary and on/off values convert losslessly.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Numeric(v) => Some(v),
            ParamValue::OnOff(v) => Some(if v { 1.0 } else { 0.0 }),
            ParamValue::Status(v) | ParamValue::Binary(v) => Some(v as f64),
            ParamValue::Text(_) => None,
        }
    }

    /// Interpret the value as a raw status word.
    ///
    /// Some wrappers hand status words back as plain numbers, so integral numerics are accepted.
    pub fn as_status(&self) -> Option<u32> {
        match *self {
            ParamValue::Status(v) | ParamValue::Binary(v) => Some(v),
            ParamValue::Numeric(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
                Some(v as u32)
            }
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParamValue::OnOff(v) => Some(v),
            ParamValue::Numeric(v) => Some(v != 0.0),
            ParamValue::Status(v) | ParamValue::Binary(v) => Some(v != 0),
            ParamValue::Text(_) => None,
        }
    }

    /// Round numeric values to the given number of decimals. Other values are returned as is.
    pub fn rounded(self, decimals: i32) -> Self {
        match self {
            ParamValue::Numeric(v) => {
                let scale = 10f64.powi(decimals);
                ParamValue::Numeric((v * scale).round() / scale)
            }
            other => other,
        }
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParamValue::Numeric(v) => write!(f, "{v}"),
            ParamValue::OnOff(v) => write!(f, "{}", if *v { "On" } else { "Off" }),
            ParamValue::Status(v) => write!(f, "{v:#06x}"),
            ParamValue::Binary(v) => write!(f, "{v}"),
            ParamValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Numeric(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::OnOff(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_owned())
    }
}

/// One populated slot of the crate map.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct BoardInfo {
    pub model: String,
    pub description: String,
    pub n_channel: u16,
    pub serial_number: u16,
    pub fw_release: String,
}

/// Status value reported by a channel that is not in operating state.
///
/// When a channel reports this, only its setpoint may be updated.
pub const STATUS_NOT_READY: u32 = 255;

/// Decoded channel status word.
#[bitfield(bits = 16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStatus {
    /// 0: Channel is on.
    pub on: bool,
    /// 1: Channel is ramping up.
    pub ramping_up: bool,
    /// 2: Channel is ramping down.
    pub ramping_down: bool,
    /// 3: Over-current.
    pub over_current: bool,
    /// 4: Over-voltage.
    pub over_voltage: bool,
    /// 5: Under-voltage.
    pub under_voltage: bool,
    /// 6: External trip.
    pub external_trip: bool,
    /// 7: Output at the hardware voltage limit.
    pub max_voltage: bool,
    /// 8: External disable.
    pub external_disable: bool,
    /// 9: Internal trip.
    pub internal_trip: bool,
    /// 10: Calibration error.
    pub calibration_error: bool,
    /// 11: Channel is unplugged.
    pub unplugged: bool,
    #[skip]
    __: bool,
    /// 13: Over-voltage protection.
    pub over_voltage_protection: bool,
    /// 14: Power fail.
    pub power_fail: bool,
    /// 15: Temperature error.
    pub temperature_error: bool,
}

impl ChannelStatus {
    /// Decode a raw status word. Only the lower 16 bits carry flags.
    pub fn from_raw(raw: u32) -> Self {
        ChannelStatus::from_bytes((raw as u16).to_le_bytes())
    }

    pub fn to_raw(self) -> u32 {
        u16::from_le_bytes(self.into_bytes()) as u32
    }

    /// True when any trip or fault flag is raised.
    pub fn has_fault(&self) -> bool {
        self.over_current()
            || self.over_voltage()
            || self.under_voltage()
            || self.external_trip()
            || self.internal_trip()
            || self.calibration_error()
            || self.unplugged()
            || self.power_fail()
            || self.temperature_error()
    }
}
