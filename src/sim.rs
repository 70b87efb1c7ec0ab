//! An in-memory crate used to exercise the controller without hardware.
//!
//! [`SimCrate`] implements [`Connector`]; all sessions it opens share the same crate state, as do
//! clones of the `SimCrate` itself. Value reads and writes are recorded in a journal and failures
//! can be injected per parameter name.
//!
//! The channel model is crude: switching a channel on sets its monitored voltage to the setpoint
//! and raises the "on" status bit immediately.

use std::{cell::RefCell, rc::Rc};

use thiserror::Error;

use crate::{
    error::{VendorError, VendorErrorCode},
    types::{
        BoardInfo, LinkType, ParamMode, ParamProp, ParamType, ParamValue, STATUS_NOT_READY,
        SystemType,
    },
    vendor::{Connector, Session, SessionError},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("CAENHV_NOTCONNECTED")]
    NotConnected,
    #[error("Connection failed")]
    ConnectionRefused,
    #[error("CFE server down")]
    ServerDown,
    #[error("No board in slot {0}")]
    NoBoard(u16),
    #[error("No channel {channel} in slot {slot}")]
    NoChannel { slot: u16, channel: u16 },
    #[error("Parameter {0} not found")]
    NoParam(String),
    #[error("Parameter {0} is read-only")]
    ReadOnly(String),
    #[error("Parameter {0} is write-only")]
    WriteOnly(String),
    #[error("Simulated failure: {0}")]
    Injected(String),
}

impl VendorError for SimError {
    fn code(&self) -> Option<VendorErrorCode> {
        let code = match self {
            SimError::NotConnected => VendorErrorCode::NotConnected,
            SimError::ConnectionRefused => VendorErrorCode::ConnectionFailed,
            SimError::ServerDown => VendorErrorCode::ServerDown,
            _ => VendorErrorCode::Other,
        };
        Some(code)
    }
}

/// Vendor calls that touch values or the session, in the order they were made.
///
/// Metadata queries (parameter lists and props, the crate map) are not recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    Open,
    Close,
    ReadSystem(String),
    WriteSystem(String, ParamValue),
    ReadBoard {
        slot: u16,
        name: String,
    },
    WriteBoard {
        slot: u16,
        name: String,
        value: ParamValue,
    },
    ReadChannel {
        slot: u16,
        channel: u16,
        name: String,
    },
    WriteChannel {
        slot: u16,
        channel: u16,
        name: String,
        value: ParamValue,
    },
    Subscribe {
        slot: u16,
        channel: u16,
        names: Vec<String>,
    },
}

impl SimCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            SimCall::WriteSystem(..) | SimCall::WriteBoard { .. } | SimCall::WriteChannel { .. }
        )
    }
}

#[derive(Debug, Clone)]
struct SimParam {
    prop: ParamProp,
    value: ParamValue,
}

/// Named parameters, kept in definition order.
#[derive(Debug, Clone, Default)]
struct ParamSet(Vec<(String, SimParam)>);

impl ParamSet {
    fn get(&self, name: &str) -> Result<&SimParam, SimError> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
            .ok_or_else(|| SimError::NoParam(name.to_owned()))
    }

    fn get_mut(&mut self, name: &str) -> Result<&mut SimParam, SimError> {
        self.0
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, p)| p)
            .ok_or_else(|| SimError::NoParam(name.to_owned()))
    }

    fn define(&mut self, name: &str, prop: ParamProp, value: ParamValue) {
        match self.get_mut(name) {
            Ok(param) => *param = SimParam { prop, value },
            Err(_) => self.0.push((name.to_owned(), SimParam { prop, value })),
        }
    }

    fn names(&self) -> Vec<String> {
        self.0.iter().map(|(n, _)| n.clone()).collect()
    }

    fn read(&self, name: &str) -> Result<ParamValue, SimError> {
        let param = self.get(name)?;
        if !param.prop.mode.is_readable() {
            return Err(SimError::WriteOnly(name.to_owned()));
        }
        Ok(param.value.clone())
    }

    fn write(&mut self, name: &str, value: &ParamValue) -> Result<(), SimError> {
        let param = self.get_mut(name)?;
        if !param.prop.mode.is_writable() {
            return Err(SimError::ReadOnly(name.to_owned()));
        }
        param.value = value.clone();
        Ok(())
    }

    fn numeric(&self, name: &str) -> f64 {
        self.get(name)
            .ok()
            .and_then(|p| p.value.as_f64())
            .unwrap_or(0.0)
    }
}

const RW: ParamMode = ParamMode::ReadWrite;
const RO: ParamMode = ParamMode::ReadOnly;
const WO: ParamMode = ParamMode::WriteOnly;

fn default_channel() -> ParamSet {
    use ParamType as T;
    use ParamValue as V;

    let mut set = ParamSet::default();
    let defs = [
        ("V0Set", T::Numeric, RW, V::Numeric(0.0)),
        ("I0Set", T::Numeric, RW, V::Numeric(10.0)),
        ("V1Set", T::Numeric, RW, V::Numeric(0.0)),
        ("I1Set", T::Numeric, RW, V::Numeric(1010.0)),
        ("RUp", T::Numeric, RW, V::Numeric(20.0)),
        ("RDWn", T::Numeric, RW, V::Numeric(20.0)),
        ("Trip", T::Numeric, RW, V::Numeric(10.0)),
        ("SVMax", T::Numeric, RW, V::Numeric(1000.0)),
        ("VMon", T::Numeric, RO, V::Numeric(0.0)),
        ("IMon", T::Numeric, RO, V::Numeric(0.0)),
        ("Status", T::ChStatus, RO, V::Status(0)),
        ("Temp", T::Numeric, RO, V::Numeric(25.0)),
        ("Pw", T::OnOff, RW, V::OnOff(false)),
        ("POn", T::OnOff, RW, V::OnOff(false)),
        ("PDwn", T::OnOff, RW, V::OnOff(false)),
        ("TripInt", T::Binary, RW, V::Binary(0)),
        ("TripExt", T::Binary, RW, V::Binary(0)),
        ("ImRange", T::Enum, RW, V::Numeric(0.0)),
        ("ZCDetect", T::OnOff, RW, V::OnOff(true)),
        ("ZCAdjust", T::OnOff, RW, V::OnOff(false)),
    ];
    for (name, param_type, mode, value) in defs {
        set.define(name, ParamProp::new(param_type, mode), value);
    }
    set
}

fn default_board() -> ParamSet {
    let mut set = ParamSet::default();
    set.define(
        "BdStatus",
        ParamProp::new(ParamType::BdStatus, RO),
        ParamValue::Status(0),
    );
    set.define(
        "HVMax",
        ParamProp::new(ParamType::Numeric, RO),
        ParamValue::Numeric(3000.0),
    );
    set.define(
        "Temp",
        ParamProp::new(ParamType::Numeric, RO),
        ParamValue::Numeric(31.5),
    );
    set.define(
        "ClrAlarm",
        ParamProp::new(ParamType::OnOff, WO),
        ParamValue::OnOff(false),
    );
    set
}

fn default_system() -> ParamSet {
    let mut set = ParamSet::default();
    set.define(
        "ModelName",
        ParamProp::new(ParamType::String, RO),
        ParamValue::from("SY4527"),
    );
    set.define(
        "SwRelease",
        ParamProp::new(ParamType::String, RO),
        ParamValue::from("6.02.01"),
    );
    set.define(
        "IPAddress",
        ParamProp::new(ParamType::String, RW),
        ParamValue::from("192.168.0.1"),
    );
    set
}

/// Bring monitored voltage and the "on" bit in line with the power state.
fn settle_channel(channel: &mut ParamSet) {
    let on = channel
        .get("Pw")
        .ok()
        .and_then(|p| p.value.as_bool())
        .unwrap_or(false);
    let vmon = if on { channel.numeric("V0Set") } else { 0.0 };
    if let Ok(param) = channel.get_mut("VMon") {
        param.value = ParamValue::Numeric(vmon);
    }
    if let Ok(param) = channel.get_mut("Status") {
        let raw = param.value.as_status().unwrap_or(0);
        if raw != STATUS_NOT_READY {
            param.value = ParamValue::Status(if on { raw | 1 } else { raw & !1 });
        }
    }
}

#[derive(Debug, Clone)]
struct SimBoard {
    info: BoardInfo,
    params: ParamSet,
    channels: Vec<ParamSet>,
}

#[derive(Debug, Default)]
struct SimState {
    slots: Vec<Option<SimBoard>>,
    system: ParamSet,
    journal: Vec<SimCall>,
    refuse_open: bool,
    close_error: Option<SimError>,
    failing_reads: Vec<String>,
    failing_writes: Vec<String>,
    failing_listings: bool,
    open_sessions: usize,
}

impl SimState {
    fn board(&mut self, slot: u16) -> Result<&mut SimBoard, SimError> {
        self.slots
            .get_mut(slot as usize)
            .and_then(Option::as_mut)
            .ok_or(SimError::NoBoard(slot))
    }

    fn channel(&mut self, slot: u16, channel: u16) -> Result<&mut ParamSet, SimError> {
        self.board(slot)?
            .channels
            .get_mut(channel as usize)
            .ok_or(SimError::NoChannel { slot, channel })
    }

    fn check_read(&self, name: &str) -> Result<(), SimError> {
        if self.failing_reads.iter().any(|n| n == name) {
            return Err(SimError::Injected(format!("read of {name}")));
        }
        Ok(())
    }

    fn check_listing(&self) -> Result<(), SimError> {
        if self.failing_listings {
            return Err(SimError::Injected("parameter listing".to_owned()));
        }
        Ok(())
    }

    fn check_write(&self, name: &str) -> Result<(), SimError> {
        if self.failing_writes.iter().any(|n| n == name) {
            return Err(SimError::Injected(format!("write of {name}")));
        }
        Ok(())
    }
}

/// A simulated crate. See the module docs.
#[derive(Debug, Clone, Default)]
pub struct SimCrate {
    state: Rc<RefCell<SimState>>,
}

impl SimCrate {
    /// An empty crate with `slots` slots.
    pub fn new(slots: u16) -> Self {
        let state = SimState {
            slots: vec![None; slots as usize],
            system: default_system(),
            ..Default::default()
        };
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// A crate with just enough slots for one board of `n_channel` channels in `slot`.
    pub fn with_board(slot: u16, n_channel: u16) -> Self {
        let sim = Self::new(slot + 1);
        sim.add_board(slot, "A1535", n_channel);
        sim
    }

    pub fn add_board(&self, slot: u16, model: &str, n_channel: u16) {
        let mut state = self.state.borrow_mut();
        if state.slots.len() <= slot as usize {
            state.slots.resize(slot as usize + 1, None);
        }
        state.slots[slot as usize] = Some(SimBoard {
            info: BoardInfo {
                model: model.to_owned(),
                description: format!("{n_channel} Ch simulated HV board"),
                n_channel,
                serial_number: 1000 + slot,
                fw_release: "1.01".to_owned(),
            },
            params: default_board(),
            channels: vec![default_channel(); n_channel as usize],
        });
    }

    /// Set a channel value directly, bypassing its mode. Useful to preload readings.
    ///
    /// # Panics
    /// If the board, channel or parameter does not exist.
    pub fn set_channel_value(&self, slot: u16, channel: u16, name: &str, value: ParamValue) {
        let mut state = self.state.borrow_mut();
        let param = state
            .channel(slot, channel)
            .and_then(|ch| ch.get_mut(name))
            .expect("simulated channel parameter exists");
        param.value = value;
    }

    pub fn channel_value(&self, slot: u16, channel: u16, name: &str) -> Option<ParamValue> {
        let mut state = self.state.borrow_mut();
        let channel = state.channel(slot, channel).ok()?;
        channel.get(name).ok().map(|p| p.value.clone())
    }

    /// Add or replace a channel parameter.
    ///
    /// # Panics
    /// If the board or channel does not exist.
    pub fn define_channel_param(
        &self,
        slot: u16,
        channel: u16,
        name: &str,
        prop: ParamProp,
        value: ParamValue,
    ) {
        let mut state = self.state.borrow_mut();
        state
            .channel(slot, channel)
            .expect("simulated channel exists")
            .define(name, prop, value);
    }

    /// Add or replace a system property.
    pub fn define_system_prop(&self, name: &str, prop: ParamProp, value: ParamValue) {
        self.state.borrow_mut().system.define(name, prop, value);
    }

    /// Make every read of the named parameter fail, on any level.
    pub fn fail_reads_of(&self, name: &str) {
        self.state.borrow_mut().failing_reads.push(name.to_owned());
    }

    /// Make every write of the named parameter fail, on any level.
    pub fn fail_writes_of(&self, name: &str) {
        self.state.borrow_mut().failing_writes.push(name.to_owned());
    }

    /// Make system, board and channel parameter listings fail.
    pub fn fail_listing(&self, fail: bool) {
        self.state.borrow_mut().failing_listings = fail;
    }

    /// Remove all injected read, write and listing failures.
    pub fn clear_failures(&self) {
        let mut state = self.state.borrow_mut();
        state.failing_reads.clear();
        state.failing_writes.clear();
        state.failing_listings = false;
    }

    pub fn refuse_open(&self, refuse: bool) {
        self.state.borrow_mut().refuse_open = refuse;
    }

    /// Make closing a session report this error. The session is closed regardless.
    pub fn fail_close_with(&self, error: Option<SimError>) {
        self.state.borrow_mut().close_error = error;
    }

    pub fn journal(&self) -> Vec<SimCall> {
        self.state.borrow().journal.clone()
    }

    /// Only the writes from the journal.
    pub fn writes(&self) -> Vec<SimCall> {
        self.state
            .borrow()
            .journal
            .iter()
            .filter(|c| c.is_write())
            .cloned()
            .collect()
    }

    pub fn clear_journal(&self) {
        self.state.borrow_mut().journal.clear();
    }

    /// Sessions opened and not yet closed.
    pub fn open_sessions(&self) -> usize {
        self.state.borrow().open_sessions
    }

    pub fn open_session(&self) -> Result<SimSession, SimError> {
        let mut state = self.state.borrow_mut();
        if state.refuse_open {
            return Err(SimError::ConnectionRefused);
        }
        state.journal.push(SimCall::Open);
        state.open_sessions += 1;
        Ok(SimSession {
            state: Rc::clone(&self.state),
        })
    }
}

impl Connector for SimCrate {
    type Session = SimSession;

    fn open(
        &mut self,
        _system: SystemType,
        _link: LinkType,
        _address: &str,
        _username: &str,
        _password: &str,
    ) -> Result<SimSession, SessionError<Self>> {
        self.open_session()
    }
}

/// A session on a [`SimCrate`].
#[derive(Debug)]
pub struct SimSession {
    state: Rc<RefCell<SimState>>,
}

impl Session for SimSession {
    type Error = SimError;

    fn close(self) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::Close);
        state.open_sessions -= 1;
        match state.close_error.clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn crate_map(&mut self) -> Result<Vec<Option<BoardInfo>>, SimError> {
        let state = self.state.borrow();
        Ok(state
            .slots
            .iter()
            .map(|b| b.as_ref().map(|b| b.info.clone()))
            .collect())
    }

    fn sys_prop_list(&mut self) -> Result<Vec<String>, SimError> {
        let state = self.state.borrow();
        state.check_listing()?;
        Ok(state.system.names())
    }

    fn sys_prop_info(&mut self, name: &str) -> Result<ParamProp, SimError> {
        Ok(self.state.borrow().system.get(name)?.prop)
    }

    fn sys_prop(&mut self, name: &str) -> Result<ParamValue, SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::ReadSystem(name.to_owned()));
        state.check_read(name)?;
        state.system.read(name)
    }

    fn set_sys_prop(&mut self, name: &str, value: &ParamValue) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        state
            .journal
            .push(SimCall::WriteSystem(name.to_owned(), value.clone()));
        state.check_write(name)?;
        state.system.write(name, value)
    }

    fn bd_param_info(&mut self, slot: u16) -> Result<Vec<String>, SimError> {
        let mut state = self.state.borrow_mut();
        state.check_listing()?;
        Ok(state.board(slot)?.params.names())
    }

    fn bd_param_prop(&mut self, slot: u16, name: &str) -> Result<ParamProp, SimError> {
        Ok(self.state.borrow_mut().board(slot)?.params.get(name)?.prop)
    }

    fn bd_param(&mut self, slot: u16, name: &str) -> Result<ParamValue, SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::ReadBoard {
            slot,
            name: name.to_owned(),
        });
        state.check_read(name)?;
        state.board(slot)?.params.read(name)
    }

    fn set_bd_param(&mut self, slot: u16, name: &str, value: &ParamValue) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::WriteBoard {
            slot,
            name: name.to_owned(),
            value: value.clone(),
        });
        state.check_write(name)?;
        state.board(slot)?.params.write(name, value)
    }

    fn ch_param_info(&mut self, slot: u16, channel: u16) -> Result<Vec<String>, SimError> {
        let mut state = self.state.borrow_mut();
        state.check_listing()?;
        Ok(state.channel(slot, channel)?.names())
    }

    fn ch_param_prop(&mut self, slot: u16, channel: u16, name: &str) -> Result<ParamProp, SimError> {
        Ok(self.state.borrow_mut().channel(slot, channel)?.get(name)?.prop)
    }

    fn ch_param(&mut self, slot: u16, channel: u16, name: &str) -> Result<ParamValue, SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::ReadChannel {
            slot,
            channel,
            name: name.to_owned(),
        });
        state.check_read(name)?;
        state.channel(slot, channel)?.read(name)
    }

    fn set_ch_param(
        &mut self,
        slot: u16,
        channel: u16,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::WriteChannel {
            slot,
            channel,
            name: name.to_owned(),
            value: value.clone(),
        });
        state.check_write(name)?;
        let params = state.channel(slot, channel)?;
        params.write(name, value)?;
        settle_channel(params);
        Ok(())
    }

    fn subscribe_ch_params(
        &mut self,
        slot: u16,
        channel: u16,
        names: &[&str],
    ) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        state.journal.push(SimCall::Subscribe {
            slot,
            channel,
            names: names.iter().map(|n| n.to_string()).collect(),
        });
        let params = state.channel(slot, channel)?;
        for name in names {
            params.get(name)?;
        }
        Ok(())
    }
}
