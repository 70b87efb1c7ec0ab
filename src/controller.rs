use std::time::{Duration, SystemTime};

use log::{debug, info, warn};

use crate::{
    channel_config::ChannelConfig,
    clock::{Clock, SystemClock},
    config::ControllerConfig,
    connection::{ConnectionState, Disconnect},
    error::{Error, ParamLocation, Result},
    param::{ChannelParam, DEFAULT_CHANNEL_REPORT},
    ramp::{self, RampPlan},
    report::{BoardReport, CrateFilter, ParamTable, UNREADABLE},
    types::{BoardInfo, ChannelStatus, ParamProp, ParamValue, STATUS_NOT_READY},
    vendor::{Connector, Session, SessionError},
};

/// Result of [`HvController::set_channel_voltage`].
#[derive(Debug, Clone, PartialEq)]
pub enum RampOutcome {
    /// Setpoint written, channel powered and the settle time waited out.
    Settled {
        waited: Duration,
        /// Status read back after waiting, if it could be read.
        final_status: Option<ChannelStatus>,
    },
    /// The channel is not in operating state: only the setpoint was written, it was not powered
    /// and nothing was waited for.
    SetpointOnly { status: u32 },
    /// A reading needed to plan the ramp was unavailable. Nothing was written.
    Aborted(AbortReason),
}

impl RampOutcome {
    pub fn is_partial(&self) -> bool {
        matches!(self, RampOutcome::SetpointOnly { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    StatusUnreadable,
    ReadingUnavailable(ChannelParam),
}

/// Controls one HV crate through a vendor [`Connector`].
///
/// Operations that need the crate open a session if none is open and close it again when done.
/// A session that was already open, e.g. the one [`connect`](Self::connect) leaves behind, stays
/// open. Dropping the controller closes any open session.
///
/// For its methods, "read"/"write" go through the parameter mode checks, while operations like
/// [`set_channel_voltage`](Self::set_channel_voltage) talk to the vendor directly.
pub struct HvController<C: Connector, K: Clock = SystemClock> {
    connector: C,
    config: ControllerConfig,
    clock: K,
    state: ConnectionState<C::Session>,
    /// Crate map as of the last open.
    slots: Vec<Option<BoardInfo>>,
    sys_props: Vec<String>,
}

impl<C: Connector> HvController<C, SystemClock> {
    /// Connect to the crate described by `config` and keep the session open.
    pub fn connect(connector: C, config: ControllerConfig) -> Result<Self, SessionError<C>> {
        Self::connect_with_clock(connector, config, SystemClock)
    }
}

impl<C: Connector, K: Clock> HvController<C, K> {
    pub fn connect_with_clock(
        connector: C,
        config: ControllerConfig,
        clock: K,
    ) -> Result<Self, SessionError<C>> {
        let mut controller = Self {
            connector,
            config,
            clock,
            state: ConnectionState::default(),
            slots: Vec::new(),
            sys_props: Vec::new(),
        };
        controller.open()?;
        controller.sys_props = controller
            .session()?
            .sys_prop_list()
            .map_err(Error::ReadFailure)?;
        info!(
            "Connected to {} crate at {} over {}",
            controller.config.system_type, controller.config.address, controller.config.link_type
        );
        Ok(controller)
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// One entry per slot, `None` for empty slots.
    pub fn crate_map(&self) -> &[Option<BoardInfo>] {
        &self.slots
    }

    /// System property names as listed when the controller connected.
    pub fn system_props(&self) -> &[String] {
        &self.sys_props
    }

    /// All (slot, channel) pairs of the crate map.
    pub fn channels(&self) -> Vec<(u16, u16)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, board)| board.as_ref().map(|b| (slot as u16, b.n_channel)))
            .flat_map(|(slot, n_channel)| (0..n_channel).map(move |ch| (slot, ch)))
            .collect()
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_open()
    }

    /// End of the current dispatch window, if one is running.
    pub fn dispatched_until(&self) -> Option<SystemTime> {
        self.state.dispatched_until(self.clock.now())
    }

    fn open(&mut self) -> Result<(), SessionError<C>> {
        let now = self.clock.now();
        let Self {
            connector,
            config,
            state,
            ..
        } = self;
        state.open_with(now, || {
            connector.open(
                config.system_type,
                config.link_type,
                &config.address,
                &config.username,
                &config.password,
            )
        })?;

        let map = self.session()?.crate_map();
        match map {
            Ok(slots) => {
                self.slots = slots;
                Ok(())
            }
            Err(e) => {
                self.state.close();
                Err(Error::ConnectFailure(e))
            }
        }
    }

    /// Close any open session and open a new one.
    pub fn reconnect(&mut self) -> Result<(), SessionError<C>> {
        self.state.close();
        self.open()
    }

    /// Close the session. Never fails, the returned value says how closing went.
    pub fn disconnect(&mut self) -> Disconnect<SessionError<C>> {
        let outcome = self.state.close();
        if matches!(outcome, Disconnect::Closed) {
            debug!("Disconnected from crate at {}", self.config.address);
        }
        outcome
    }

    /// Close the session and refuse to reopen it for `window`.
    ///
    /// Lets an external party take over the crate for a while without racing our reconnects.
    pub fn dispatch(&mut self, window: Duration) -> Disconnect<SessionError<C>> {
        let until = self.clock.now() + window;
        info!("Dispatching crate at {} for {:?}", self.config.address, window);
        self.state.dispatch(until)
    }

    /// Run `op` with an open session.
    ///
    /// Opens a session first if none is open, and in that case closes it again afterwards,
    /// whatever `op` returned. Errors while closing are logged and do not affect the result.
    pub fn with_connection<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, SessionError<C>>,
    ) -> Result<T, SessionError<C>> {
        let opened_here = !self.state.is_open();
        if opened_here {
            self.open()?;
        }
        let result = op(self);
        if opened_here {
            self.state.close();
        }
        result
    }

    fn session(&mut self) -> Result<&mut C::Session, SessionError<C>> {
        self.state.session_mut().ok_or(Error::NotConnected)
    }

    fn board(&self, slot: u16) -> Result<&BoardInfo, SessionError<C>> {
        self.slots
            .get(slot as usize)
            .and_then(Option::as_ref)
            .ok_or(Error::NoSuchBoard { slot })
    }

    fn check_channel(&self, slot: u16, channel: u16) -> Result<(), SessionError<C>> {
        match self.board(slot) {
            Ok(board) if channel < board.n_channel => Ok(()),
            _ => Err(Error::NoSuchChannel { slot, channel }),
        }
    }

    fn check_location(&self, location: ParamLocation) -> Result<(), SessionError<C>> {
        match location {
            ParamLocation::System => Ok(()),
            ParamLocation::Board { slot } => self.board(slot).map(|_| ()),
            ParamLocation::Channel { slot, channel } => self.check_channel(slot, channel),
        }
    }

    /// Look up mode and type of a listed parameter.
    fn param_prop(&mut self, location: ParamLocation, name: &str) -> Result<ParamProp, SessionError<C>> {
        self.check_location(location)?;
        let session = self.session()?;
        let listed = param_names(session, location).map_err(Error::ReadFailure)?;
        if !listed.iter().any(|n| n == name) {
            return Err(Error::ParamNotFound {
                location,
                name: name.to_owned(),
            });
        }
        prop_at(session, location, name).map_err(Error::ReadFailure)
    }

    fn read_param(
        &mut self,
        location: ParamLocation,
        name: &str,
    ) -> Result<Option<ParamValue>, SessionError<C>> {
        self.with_connection(|ctl| {
            let prop = ctl.param_prop(location, name)?;
            if !prop.mode.is_readable() {
                return Err(Error::ParamModeViolation {
                    location,
                    name: name.to_owned(),
                    mode: prop.mode,
                });
            }
            match read_at(ctl.session()?, location, name) {
                Ok(value) => Ok(Some(value.rounded(2))),
                Err(e) => {
                    warn!("Failed to read {name} of {location}: {e}");
                    Ok(None)
                }
            }
        })
    }

    fn write_param(
        &mut self,
        location: ParamLocation,
        name: &str,
        value: ParamValue,
    ) -> Result<(), SessionError<C>> {
        self.with_connection(|ctl| {
            let prop = ctl.param_prop(location, name)?;
            if !prop.mode.is_writable() {
                return Err(Error::ParamModeViolation {
                    location,
                    name: name.to_owned(),
                    mode: prop.mode,
                });
            }
            write_at(ctl.session()?, location, name, &value).map_err(Error::WriteFailure)
        })
    }

    /// Read a channel parameter.
    ///
    /// Returns `Ok(None)` when the vendor fails to deliver the value. Unknown and write-only
    /// parameters are errors. Numeric values are rounded to two decimals.
    pub fn read_channel_param(
        &mut self,
        slot: u16,
        channel: u16,
        name: impl AsRef<str>,
    ) -> Result<Option<ParamValue>, SessionError<C>> {
        self.read_param(ParamLocation::Channel { slot, channel }, name.as_ref())
    }

    /// Write a channel parameter. Unknown and read-only parameters are errors.
    pub fn write_channel_param(
        &mut self,
        slot: u16,
        channel: u16,
        name: impl AsRef<str>,
        value: impl Into<ParamValue>,
    ) -> Result<(), SessionError<C>> {
        self.write_param(
            ParamLocation::Channel { slot, channel },
            name.as_ref(),
            value.into(),
        )
    }

    pub fn read_board_param(
        &mut self,
        slot: u16,
        name: impl AsRef<str>,
    ) -> Result<Option<ParamValue>, SessionError<C>> {
        self.read_param(ParamLocation::Board { slot }, name.as_ref())
    }

    pub fn write_board_param(
        &mut self,
        slot: u16,
        name: impl AsRef<str>,
        value: impl Into<ParamValue>,
    ) -> Result<(), SessionError<C>> {
        self.write_param(ParamLocation::Board { slot }, name.as_ref(), value.into())
    }

    pub fn read_system_prop(
        &mut self,
        name: impl AsRef<str>,
    ) -> Result<Option<ParamValue>, SessionError<C>> {
        self.read_param(ParamLocation::System, name.as_ref())
    }

    pub fn write_system_prop(
        &mut self,
        name: impl AsRef<str>,
        value: impl Into<ParamValue>,
    ) -> Result<(), SessionError<C>> {
        self.write_param(ParamLocation::System, name.as_ref(), value.into())
    }

    /// Ask the vendor to push change events for these channel parameters.
    pub fn subscribe_channel_params(
        &mut self,
        slot: u16,
        channel: u16,
        names: &[&str],
    ) -> Result<(), SessionError<C>> {
        self.with_connection(|ctl| {
            ctl.check_channel(slot, channel)?;
            ctl.session()?
                .subscribe_ch_params(slot, channel, names)
                .map_err(Error::ReadFailure)
        })
    }

    /// Read a channel value without mode checks. Vendor failures are logged and give `None`.
    fn reading(
        &mut self,
        slot: u16,
        channel: u16,
        param: ChannelParam,
    ) -> Result<Option<ParamValue>, SessionError<C>> {
        match self.session()?.ch_param(slot, channel, param.as_ref()) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Failed to read {param} of slot {slot} ch {channel}: {e}");
                Ok(None)
            }
        }
    }

    fn unexpected(slot: u16, channel: u16, param: ChannelParam) -> Error<SessionError<C>> {
        Error::UnexpectedValue {
            location: ParamLocation::Channel { slot, channel },
            name: param.to_string(),
        }
    }

    fn put(
        &mut self,
        slot: u16,
        channel: u16,
        param: ChannelParam,
        value: ParamValue,
    ) -> Result<(), SessionError<C>> {
        self.session()?
            .set_ch_param(slot, channel, param.as_ref(), &value)
            .map_err(Error::WriteFailure)
    }

    /// Set a channel's voltage setpoint, power it if needed and wait for it to settle.
    ///
    /// The wait is the ramp time for the voltage change, rounded up to whole seconds, plus
    /// [`SETTLE_MARGIN`](ramp::SETTLE_MARGIN). Missing readings abort before anything is written
    /// and are not errors, see [`RampOutcome`]. A zero ramp rate or a target that is not a finite
    /// number is an error, also before any write. Write failures are errors; writes made before
    /// the failure stay in place.
    pub fn set_channel_voltage(
        &mut self,
        slot: u16,
        channel: u16,
        target: f64,
    ) -> Result<RampOutcome, SessionError<C>> {
        if !target.is_finite() {
            return Err(Error::NonFiniteSetpoint { target });
        }
        self.with_connection(|ctl| ctl.ramp_channel(slot, channel, target))
    }

    fn ramp_channel(
        &mut self,
        slot: u16,
        channel: u16,
        target: f64,
    ) -> Result<RampOutcome, SessionError<C>> {
        use ChannelParam as CP;

        self.check_channel(slot, channel)?;

        let Some(status) = self.reading(slot, channel, CP::Status)? else {
            warn!("Could not read Status for slot {slot} ch {channel}; aborting HV set");
            return Ok(RampOutcome::Aborted(AbortReason::StatusUnreadable));
        };
        let raw_status = status
            .as_status()
            .ok_or_else(|| Self::unexpected(slot, channel, CP::Status))?;

        if raw_status == STATUS_NOT_READY {
            warn!(
                "Channel {channel} in slot {slot} is not in operating status ({raw_status}), only updating V0Set"
            );
            self.put(slot, channel, CP::V0Set, target.into())?;
            return Ok(RampOutcome::SetpointOnly { status: raw_status });
        }

        let mut readings = [0.0; 3];
        for (reading, param) in readings.iter_mut().zip([CP::VMon, CP::RUp, CP::RDWn]) {
            let Some(value) = self.reading(slot, channel, param)? else {
                warn!("Missing {param} for slot {slot} ch {channel}; aborting HV set");
                return Ok(RampOutcome::Aborted(AbortReason::ReadingUnavailable(param)));
            };
            *reading = value
                .as_f64()
                .ok_or_else(|| Self::unexpected(slot, channel, param))?;
        }
        let [current, ramp_up, ramp_down] = readings;
        let settle_time = RampPlan::new(target, current, ramp_up, ramp_down).settle_time()?;

        self.put(slot, channel, CP::V0Set, target.into())?;
        if !ChannelStatus::from_raw(raw_status).on() {
            self.put(slot, channel, CP::Pw, true.into())?;
        }

        let wait = ramp::to_std(settle_time);
        info!(
            "Setting and enabling HV of slot {slot} ch {channel} to {target} V, waiting {} s",
            wait.as_secs()
        );
        self.clock.sleep(wait);

        let final_status = self
            .reading(slot, channel, CP::Status)?
            .and_then(|v| v.as_status())
            .map(ChannelStatus::from_raw);
        if let Some(status) = final_status.filter(ChannelStatus::has_fault) {
            warn!("Slot {slot} ch {channel} reports a fault after ramp: {status:?}");
        }
        if self.config.verbose {
            let table = self.channel_table(slot, channel, &default_report_names())?;
            info!("Slot {slot} ch {channel} after ramp:\n{table}");
        }
        Ok(RampOutcome::Settled {
            waited: wait,
            final_status,
        })
    }

    /// Switch a channel on or off and wait the command settle time.
    pub fn power_channel(&mut self, slot: u16, channel: u16, on: bool) -> Result<(), SessionError<C>> {
        self.with_connection(|ctl| {
            ctl.write_channel_param(slot, channel, ChannelParam::Pw, on)?;
            info!(
                "Power {} channel {channel} in slot {slot}",
                if on { "on" } else { "down" }
            );
            ctl.clock.sleep(ctl.config.command_settle);
            Ok(())
        })
    }

    pub fn power_on_channel(&mut self, slot: u16, channel: u16) -> Result<(), SessionError<C>> {
        self.power_channel(slot, channel, true)
    }

    pub fn power_down_channel(&mut self, slot: u16, channel: u16) -> Result<(), SessionError<C>> {
        self.power_channel(slot, channel, false)
    }

    /// Switch off every channel that reports itself on. Returns how many were switched off.
    ///
    /// Channels whose status cannot be read are skipped.
    pub fn power_down_all_channels(&mut self) -> Result<usize, SessionError<C>> {
        self.with_connection(|ctl| {
            let mut switched = 0;
            for (slot, channel) in ctl.channels() {
                let Some(raw) = ctl
                    .reading(slot, channel, ChannelParam::Status)?
                    .and_then(|v| v.as_status())
                else {
                    warn!("Could not read Status for slot {slot} ch {channel}; skipping");
                    continue;
                };
                if ChannelStatus::from_raw(raw).on() {
                    ctl.put(slot, channel, ChannelParam::Pw, false.into())?;
                    switched += 1;
                }
            }
            info!("Powered down {switched} channels");
            ctl.clock.sleep(ctl.config.command_settle);
            Ok(switched)
        })
    }

    /// Write a full channel configuration and wait the command settle time.
    pub fn configure_channel(
        &mut self,
        slot: u16,
        channel: u16,
        config: &ChannelConfig,
    ) -> Result<(), SessionError<C>> {
        self.with_connection(|ctl| {
            ctl.check_channel(slot, channel)?;
            for (param, value) in config.writes() {
                ctl.put(slot, channel, param, value)?;
            }
            info!(
                "Configured channel {channel} in slot {slot} with HV V0={} V and current I0={} uA",
                config.v0_set(),
                config.i0_set()
            );
            ctl.clock.sleep(ctl.config.command_settle);
            Ok(())
        })
    }

    /// Table of all system properties.
    pub fn system_info(&mut self) -> Result<ParamTable, SessionError<C>> {
        self.with_connection(|ctl| {
            let cached = ctl.sys_props.clone();
            let session = ctl.session()?;
            let names = listed_or(session, ParamLocation::System, || cached);
            let mut table = ParamTable::new(["param_name", "param_value"]);
            for name in names {
                let value = report_cell(session, ParamLocation::System, &name);
                if let Some(value) = value {
                    table.push_row(vec![name, value]);
                }
            }
            Ok(table)
        })
    }

    /// Table of board parameters, all of them if `params` is empty.
    pub fn board_info(&mut self, slot: u16, params: &[&str]) -> Result<ParamTable, SessionError<C>> {
        self.with_connection(|ctl| {
            ctl.board(slot)?;
            let location = ParamLocation::Board { slot };
            let session = ctl.session()?;
            let names = requested_or_listed(session, location, params, Vec::new);
            let mut table = ParamTable::new(["Slot", "Param", "Value", "Type", "Mode"]);
            for name in names {
                let (param_type, mode) = match prop_at(session, location, &name) {
                    Ok(prop) if !prop.mode.is_readable() => continue,
                    Ok(prop) => (prop.param_type.to_string(), prop.mode.to_string()),
                    Err(_) => (UNREADABLE.to_owned(), UNREADABLE.to_owned()),
                };
                let value = read_cell(session, location, &name);
                table.push_row(vec![slot.to_string(), name, value, param_type, mode]);
            }
            Ok(table)
        })
    }

    /// One-row table of channel parameters, all of them if `params` is empty.
    pub fn channel_info(
        &mut self,
        slot: u16,
        channel: u16,
        params: &[&str],
    ) -> Result<ParamTable, SessionError<C>> {
        self.with_connection(|ctl| {
            ctl.check_channel(slot, channel)?;
            let names = requested_or_listed(
                ctl.session()?,
                ParamLocation::Channel { slot, channel },
                params,
                default_report_names,
            );
            ctl.channel_table(slot, channel, &names)
        })
    }

    /// Channel table with V0Set, I0Set, VMon, IMon, Status, Pw and Temp.
    pub fn channel_summary(&mut self, slot: u16, channel: u16) -> Result<ParamTable, SessionError<C>> {
        self.with_connection(|ctl| {
            ctl.check_channel(slot, channel)?;
            ctl.channel_table(slot, channel, &default_report_names())
        })
    }

    fn channel_table(
        &mut self,
        slot: u16,
        channel: u16,
        names: &[String],
    ) -> Result<ParamTable, SessionError<C>> {
        let (headers, row) = channel_row(self.session()?, slot, channel, names);
        let mut table = ParamTable::new(headers);
        table.push_row(row);
        Ok(table)
    }

    /// Board summaries and channel tables for the slots, channels and parameters in `filter`.
    pub fn crate_info(&mut self, filter: &CrateFilter) -> Result<Vec<BoardReport>, SessionError<C>> {
        self.with_connection(|ctl| {
            let boards: Vec<(u16, BoardInfo)> = ctl
                .slots
                .iter()
                .enumerate()
                .filter_map(|(slot, board)| Some((slot as u16, board.clone()?)))
                .filter(|(slot, _)| filter.includes_slot(*slot))
                .collect();

            let session = ctl.session()?;
            let mut reports = Vec::with_capacity(boards.len());
            for (slot, board) in boards {
                let location = ParamLocation::Board { slot };
                let mut params = Vec::new();
                for name in listed_or(session, location, Vec::new) {
                    if let Some(value) = report_cell(session, location, &name) {
                        params.push((name, value));
                    }
                }

                let mut channels = ParamTable::default();
                for channel in (0..board.n_channel).filter(|ch| filter.includes_channel(*ch)) {
                    let names = if filter.params.is_empty() {
                        let location = ParamLocation::Channel { slot, channel };
                        // Fall back to the columns of the channels before.
                        listed_or(session, location, || match channels.headers.split_first() {
                            Some((_, earlier)) => earlier.to_vec(),
                            None => default_report_names(),
                        })
                    } else {
                        filter.params.clone()
                    };
                    let (names, values) = channel_row(session, slot, channel, &names);
                    if channels.headers.is_empty() {
                        channels.headers = ["Ch".to_owned()].into_iter().chain(names.clone()).collect();
                    }
                    // Line cells up with the header, a channel may list other parameters.
                    let row = channels.headers[1..]
                        .iter()
                        .map(|header| match names.iter().position(|n| n == header) {
                            Some(i) => values[i].clone(),
                            None => UNREADABLE.to_owned(),
                        });
                    let row = [channel.to_string()].into_iter().chain(row).collect();
                    channels.push_row(row);
                }

                reports.push(BoardReport {
                    slot,
                    board,
                    params,
                    channels,
                });
            }
            Ok(reports)
        })
    }
}

impl<C: Connector, K: Clock> Drop for HvController<C, K> {
    fn drop(&mut self) {
        self.state.close();
    }
}

fn default_report_names() -> Vec<String> {
    DEFAULT_CHANNEL_REPORT
        .iter()
        .map(|p| p.as_ref().to_owned())
        .collect()
}

fn param_names<S: Session>(
    session: &mut S,
    location: ParamLocation,
) -> core::result::Result<Vec<String>, S::Error> {
    match location {
        ParamLocation::System => session.sys_prop_list(),
        ParamLocation::Board { slot } => session.bd_param_info(slot),
        ParamLocation::Channel { slot, channel } => session.ch_param_info(slot, channel),
    }
}

fn prop_at<S: Session>(
    session: &mut S,
    location: ParamLocation,
    name: &str,
) -> core::result::Result<ParamProp, S::Error> {
    match location {
        ParamLocation::System => session.sys_prop_info(name),
        ParamLocation::Board { slot } => session.bd_param_prop(slot, name),
        ParamLocation::Channel { slot, channel } => session.ch_param_prop(slot, channel, name),
    }
}

fn read_at<S: Session>(
    session: &mut S,
    location: ParamLocation,
    name: &str,
) -> core::result::Result<ParamValue, S::Error> {
    match location {
        ParamLocation::System => session.sys_prop(name),
        ParamLocation::Board { slot } => session.bd_param(slot, name),
        ParamLocation::Channel { slot, channel } => session.ch_param(slot, channel, name),
    }
}

fn write_at<S: Session>(
    session: &mut S,
    location: ParamLocation,
    name: &str,
    value: &ParamValue,
) -> core::result::Result<(), S::Error> {
    match location {
        ParamLocation::System => session.set_sys_prop(name, value),
        ParamLocation::Board { slot } => session.set_bd_param(slot, name, value),
        ParamLocation::Channel { slot, channel } => session.set_ch_param(slot, channel, name, value),
    }
}

/// Parameter names listed by the vendor, or `fallback` if listing fails.
fn listed_or<S: Session>(
    session: &mut S,
    location: ParamLocation,
    fallback: impl FnOnce() -> Vec<String>,
) -> Vec<String> {
    match param_names(session, location) {
        Ok(names) => names,
        Err(e) => {
            warn!("Failed to list parameters of {location} for report: {e}");
            fallback()
        }
    }
}

fn requested_or_listed<S: Session>(
    session: &mut S,
    location: ParamLocation,
    params: &[&str],
    fallback: impl FnOnce() -> Vec<String>,
) -> Vec<String> {
    if params.is_empty() {
        listed_or(session, location, fallback)
    } else {
        params.iter().map(|p| p.to_string()).collect()
    }
}

/// Formatted value for a report, `n/a` if it cannot be read.
fn read_cell<S: Session>(session: &mut S, location: ParamLocation, name: &str) -> String {
    match read_at(session, location, name) {
        Ok(value) => value.rounded(2).to_string(),
        Err(e) => {
            warn!("Failed to read {name} of {location} for report: {e}");
            UNREADABLE.to_owned()
        }
    }
}

/// Like [`read_cell`], but `None` for write-only parameters, which reports leave out.
fn report_cell<S: Session>(session: &mut S, location: ParamLocation, name: &str) -> Option<String> {
    match prop_at(session, location, name) {
        Ok(prop) if !prop.mode.is_readable() => None,
        _ => Some(read_cell(session, location, name)),
    }
}

/// Readable parameter names and their formatted values for one channel.
fn channel_row<S: Session>(
    session: &mut S,
    slot: u16,
    channel: u16,
    names: &[String],
) -> (Vec<String>, Vec<String>) {
    let location = ParamLocation::Channel { slot, channel };
    names
        .iter()
        .filter_map(|name| Some((name.clone(), report_cell(session, location, name)?)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        channel_config::ChannelConfigBuilder,
        clock::ManualClock,
        sim::{SimCall, SimCrate, SimError},
        types::{ParamMode, ParamType},
    };

    type TestController = HvController<SimCrate, ManualClock>;

    fn controller(sim: &SimCrate) -> (TestController, ManualClock) {
        let clock = ManualClock::new();
        let ctl =
            HvController::connect_with_clock(sim.clone(), ControllerConfig::default(), clock.clone())
                .unwrap();
        (ctl, clock)
    }

    /// Controller whose session is closed, so every call opens and closes its own.
    fn disconnected(sim: &SimCrate) -> (TestController, ManualClock) {
        let (mut ctl, clock) = controller(sim);
        ctl.disconnect();
        sim.clear_journal();
        (ctl, clock)
    }

    fn write(slot: u16, channel: u16, name: &str, value: impl Into<ParamValue>) -> SimCall {
        SimCall::WriteChannel {
            slot,
            channel,
            name: name.to_owned(),
            value: value.into(),
        }
    }

    fn read(slot: u16, channel: u16, name: &str) -> SimCall {
        SimCall::ReadChannel {
            slot,
            channel,
            name: name.to_owned(),
        }
    }

    fn preload(sim: &SimCrate, slot: u16, channel: u16, vmon: f64, rup: f64, rdwn: f64) {
        sim.set_channel_value(slot, channel, "VMon", ParamValue::Numeric(vmon));
        sim.set_channel_value(slot, channel, "RUp", ParamValue::Numeric(rup));
        sim.set_channel_value(slot, channel, "RDWn", ParamValue::Numeric(rdwn));
    }

    #[test]
    fn ramp_up_powers_on_and_waits() {
        let sim = SimCrate::with_board(4, 2);
        preload(&sim, 4, 0, 20.0, 30.0, 10.0);
        let (mut ctl, clock) = controller(&sim);
        sim.clear_journal();

        let outcome = ctl.set_channel_voltage(4, 0, 100.0).unwrap();

        // ceil(80 / 30) = 3s of ramp plus the 2s margin.
        match outcome {
            RampOutcome::Settled {
                waited,
                final_status,
            } => {
                assert_eq!(waited, Duration::from_secs(5));
                assert!(final_status.unwrap().on());
            }
            other => panic!("Unexpected outcome: {:?}", other),
        }
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
        assert_eq!(
            sim.journal(),
            vec![
                read(4, 0, "Status"),
                read(4, 0, "VMon"),
                read(4, 0, "RUp"),
                read(4, 0, "RDWn"),
                write(4, 0, "V0Set", 100.0),
                write(4, 0, "Pw", true),
                read(4, 0, "Status"),
            ]
        );
        // The session opened by connect stays open.
        assert!(ctl.is_connected());
    }

    #[test]
    fn ramp_down_of_powered_channel_skips_power_on() {
        let sim = SimCrate::with_board(0, 1);
        preload(&sim, 0, 0, 550.0, 1.0, 50.0);
        sim.set_channel_value(0, 0, "Pw", ParamValue::OnOff(true));
        sim.set_channel_value(0, 0, "Status", ParamValue::Status(1));
        let (mut ctl, clock) = controller(&sim);
        sim.clear_journal();

        let outcome = ctl.set_channel_voltage(0, 0, 100.0).unwrap();

        assert!(matches!(outcome, RampOutcome::Settled { .. }));
        assert_eq!(sim.writes(), vec![write(0, 0, "V0Set", 100.0)]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(11)]);
    }

    #[test]
    fn zero_ramp_rate_writes_nothing() {
        let sim = SimCrate::with_board(0, 1);
        preload(&sim, 0, 0, 20.0, 0.0, 10.0);
        let (mut ctl, clock) = controller(&sim);

        let result = ctl.set_channel_voltage(0, 0, 100.0);

        assert!(matches!(result, Err(Error::DivideByZeroRampRate(_))));
        assert!(sim.writes().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn not_ready_channel_only_gets_setpoint() {
        let sim = SimCrate::with_board(0, 1);
        sim.set_channel_value(0, 0, "Status", ParamValue::Status(STATUS_NOT_READY));
        let (mut ctl, clock) = controller(&sim);

        let outcome = ctl.set_channel_voltage(0, 0, 300.0).unwrap();

        assert_eq!(outcome, RampOutcome::SetpointOnly { status: 255 });
        assert!(outcome.is_partial());
        assert_eq!(sim.writes(), vec![write(0, 0, "V0Set", 300.0)]);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn unreadable_status_aborts_without_changes() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_reads_of("Status");
        let (mut ctl, clock) = controller(&sim);

        let outcome = ctl.set_channel_voltage(0, 0, 300.0).unwrap();

        assert_eq!(outcome, RampOutcome::Aborted(AbortReason::StatusUnreadable));
        assert!(sim.writes().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn unreadable_ramp_rate_aborts_without_changes() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_reads_of("RDWn");
        let (mut ctl, _clock) = controller(&sim);

        let outcome = ctl.set_channel_voltage(0, 0, 300.0).unwrap();

        assert_eq!(
            outcome,
            RampOutcome::Aborted(AbortReason::ReadingUnavailable(ChannelParam::RDWn))
        );
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn mistyped_reading_is_an_error() {
        let sim = SimCrate::with_board(0, 1);
        sim.set_channel_value(0, 0, "VMon", ParamValue::from("broken"));
        let (mut ctl, _clock) = controller(&sim);

        let result = ctl.set_channel_voltage(0, 0, 300.0);

        match result {
            Err(Error::UnexpectedValue { location, name }) => {
                assert_eq!(location, ParamLocation::Channel { slot: 0, channel: 0 });
                assert_eq!(name, "VMon");
            }
            other => panic!("Unexpected result: {:?}", other),
        }
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn failed_power_on_keeps_setpoint() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_writes_of("Pw");
        let (mut ctl, clock) = controller(&sim);

        let result = ctl.set_channel_voltage(0, 0, 40.0);

        assert!(matches!(result, Err(Error::WriteFailure(SimError::Injected(_)))));
        assert_eq!(
            sim.channel_value(0, 0, "V0Set"),
            Some(ParamValue::Numeric(40.0))
        );
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn ramp_on_missing_channel() {
        let sim = SimCrate::with_board(0, 2);
        let (mut ctl, _clock) = controller(&sim);

        let result = ctl.set_channel_voltage(0, 2, 40.0);
        assert!(matches!(
            result,
            Err(Error::NoSuchChannel {
                slot: 0,
                channel: 2
            })
        ));
        let result = ctl.set_channel_voltage(7, 0, 40.0);
        assert!(matches!(result, Err(Error::NoSuchChannel { slot: 7, .. })));
    }

    #[test]
    fn guard_opens_and_closes_when_disconnected() {
        let sim = SimCrate::with_board(0, 1);
        sim.set_channel_value(0, 0, "VMon", ParamValue::Numeric(12.3456));
        let (mut ctl, _clock) = disconnected(&sim);

        let value = ctl.read_channel_param(0, 0, ChannelParam::VMon).unwrap();

        assert_eq!(value, Some(ParamValue::Numeric(12.35)));
        assert!(!ctl.is_connected());
        assert_eq!(sim.open_sessions(), 0);
        assert_eq!(
            sim.journal(),
            vec![SimCall::Open, read(0, 0, "VMon"), SimCall::Close]
        );
    }

    #[test]
    fn guard_closes_after_inner_error() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = disconnected(&sim);

        let result = ctl.read_channel_param(0, 0, "Bogus");

        assert!(matches!(result, Err(Error::ParamNotFound { .. })));
        assert!(!ctl.is_connected());
        assert_eq!(sim.journal(), vec![SimCall::Open, SimCall::Close]);
    }

    #[test]
    fn guard_keeps_existing_session_open() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = controller(&sim);
        sim.clear_journal();

        ctl.read_channel_param(0, 0, "IMon").unwrap();
        let _ = ctl.read_channel_param(0, 0, "Bogus");

        assert!(ctl.is_connected());
        assert_eq!(sim.open_sessions(), 1);
        assert!(!sim.journal().contains(&SimCall::Close));
    }

    #[test]
    fn close_failure_does_not_mask_result() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = disconnected(&sim);
        sim.fail_close_with(Some(SimError::Injected("close".into())));

        let value = ctl.read_channel_param(0, 0, "Temp").unwrap();

        assert_eq!(value, Some(ParamValue::Numeric(25.0)));
        assert!(!ctl.is_connected());
    }

    #[test]
    fn dispatch_refuses_reconnect_until_window_passes() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, clock) = controller(&sim);

        assert!(ctl.dispatch(Duration::from_secs(60)).is_clean());
        assert!(!ctl.is_connected());
        assert!(ctl.dispatched_until().is_some());
        sim.clear_journal();

        let result = ctl.read_channel_param(0, 0, "VMon");
        assert!(matches!(result, Err(Error::Dispatched { .. })));
        assert!(matches!(ctl.reconnect(), Err(Error::Dispatched { .. })));
        assert!(sim.journal().is_empty());

        clock.advance(Duration::from_secs(60));
        assert_eq!(ctl.dispatched_until(), None);
        assert!(ctl.read_channel_param(0, 0, "VMon").unwrap().is_some());
        ctl.reconnect().unwrap();
        assert!(ctl.is_connected());
    }

    #[test]
    fn connect_failure() {
        let sim = SimCrate::with_board(0, 1);
        sim.refuse_open(true);

        let result = HvController::connect_with_clock(
            sim.clone(),
            ControllerConfig::default(),
            ManualClock::new(),
        );
        assert!(matches!(
            result,
            Err(Error::ConnectFailure(SimError::ConnectionRefused))
        ));
    }

    #[test]
    fn disconnect_twice_is_noop() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = controller(&sim);

        assert!(matches!(ctl.disconnect(), Disconnect::Closed));
        assert!(matches!(ctl.disconnect(), Disconnect::NotOpen));
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn drop_closes_session() {
        let sim = SimCrate::with_board(0, 1);
        let (ctl, _clock) = controller(&sim);
        assert_eq!(sim.open_sessions(), 1);
        drop(ctl);
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn write_only_param_is_never_read() {
        let sim = SimCrate::with_board(0, 1);
        sim.define_channel_param(
            0,
            0,
            "ClrAlarm",
            ParamProp::new(ParamType::OnOff, ParamMode::WriteOnly),
            ParamValue::OnOff(false),
        );
        let (mut ctl, _clock) = controller(&sim);
        sim.clear_journal();

        let result = ctl.read_channel_param(0, 0, "ClrAlarm");

        assert!(matches!(
            result,
            Err(Error::ParamModeViolation {
                mode: ParamMode::WriteOnly,
                ..
            })
        ));
        assert!(sim.journal().is_empty());

        // Writing it is fine.
        ctl.write_channel_param(0, 0, "ClrAlarm", true).unwrap();
        assert_eq!(sim.writes(), vec![write(0, 0, "ClrAlarm", true)]);
    }

    #[test]
    fn read_only_param_is_never_written() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = controller(&sim);
        sim.clear_journal();

        let result = ctl.write_channel_param(0, 0, ChannelParam::VMon, 10.0);

        assert!(matches!(
            result,
            Err(Error::ParamModeViolation {
                mode: ParamMode::ReadOnly,
                ..
            })
        ));
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn vendor_read_failure_gives_none() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_reads_of("IMon");
        let (mut ctl, _clock) = controller(&sim);

        assert_eq!(ctl.read_channel_param(0, 0, "IMon").unwrap(), None);
    }

    #[test]
    fn vendor_write_failure_is_an_error() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_writes_of("I0Set");
        let (mut ctl, _clock) = controller(&sim);

        let result = ctl.write_channel_param(0, 0, "I0Set", 5.0);
        assert!(matches!(result, Err(Error::WriteFailure(_))));
    }

    #[test]
    fn board_and_system_params() {
        let sim = SimCrate::with_board(1, 1);
        let (mut ctl, _clock) = controller(&sim);

        assert_eq!(
            ctl.read_board_param(1, "HVMax").unwrap(),
            Some(ParamValue::Numeric(3000.0))
        );
        assert!(matches!(
            ctl.read_board_param(1, "ClrAlarm"),
            Err(Error::ParamModeViolation { .. })
        ));
        assert!(matches!(
            ctl.read_board_param(0, "HVMax"),
            Err(Error::NoSuchBoard { slot: 0 })
        ));

        ctl.write_system_prop("IPAddress", "10.0.0.2").unwrap();
        assert_eq!(
            ctl.read_system_prop("IPAddress").unwrap(),
            Some(ParamValue::from("10.0.0.2"))
        );
        assert!(matches!(
            ctl.write_system_prop("ModelName", "SY1527"),
            Err(Error::ParamModeViolation { .. })
        ));
        assert!(ctl.system_props().contains(&"SwRelease".to_string()));
    }

    #[test]
    fn subscribe_passes_names_through() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = controller(&sim);
        sim.clear_journal();

        ctl.subscribe_channel_params(0, 0, &["VMon", "IMon"]).unwrap();
        assert_eq!(
            sim.journal(),
            vec![SimCall::Subscribe {
                slot: 0,
                channel: 0,
                names: vec!["VMon".into(), "IMon".into()]
            }]
        );
    }

    #[test]
    fn power_channel_writes_and_waits() {
        let sim = SimCrate::with_board(0, 2);
        let (mut ctl, clock) = controller(&sim);
        sim.clear_journal();

        ctl.power_on_channel(0, 1).unwrap();

        assert_eq!(sim.writes(), vec![write(0, 1, "Pw", true)]);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
        assert_eq!(sim.channel_value(0, 1, "Status"), Some(ParamValue::Status(1)));
    }

    #[test]
    fn power_down_all_only_touches_channels_that_are_on() {
        let sim = SimCrate::new(3);
        sim.add_board(0, "A1535", 4);
        sim.add_board(2, "A1535", 2);
        for (slot, channel) in [(0, 1), (0, 3), (2, 0)] {
            sim.set_channel_value(slot, channel, "Pw", ParamValue::OnOff(true));
            sim.set_channel_value(slot, channel, "Status", ParamValue::Status(1));
        }
        let (mut ctl, clock) = controller(&sim);
        sim.clear_journal();

        let switched = ctl.power_down_all_channels().unwrap();

        assert_eq!(switched, 3);
        assert_eq!(
            sim.writes(),
            vec![
                write(0, 1, "Pw", false),
                write(0, 3, "Pw", false),
                write(2, 0, "Pw", false),
            ]
        );
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn power_down_all_skips_unreadable_channels() {
        let sim = SimCrate::with_board(0, 2);
        sim.fail_reads_of("Status");
        let (mut ctl, _clock) = controller(&sim);

        assert_eq!(ctl.power_down_all_channels().unwrap(), 0);
        assert!(sim.writes().is_empty());
    }

    #[test]
    fn configure_channel_writes_everything_in_order() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, clock) = controller(&sim);
        sim.clear_journal();
        let config = ChannelConfigBuilder::new(800.0, 50.0)
            .with_ramp(10.0, 25.0)
            .build()
            .unwrap();

        ctl.configure_channel(0, 0, &config).unwrap();

        let names: Vec<String> = sim
            .writes()
            .into_iter()
            .map(|call| match call {
                SimCall::WriteChannel { name, .. } => name,
                other => panic!("Unexpected call: {:?}", other),
            })
            .collect();
        assert_eq!(
            names,
            [
                "V0Set", "I0Set", "V1Set", "I1Set", "POn", "PDwn", "RUp", "RDWn", "Trip", "SVMax",
                "ImRange", "ZCDetect", "ZCAdjust"
            ]
        );
        assert_eq!(sim.channel_value(0, 0, "RDWn"), Some(ParamValue::Numeric(25.0)));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[test]
    fn channel_report_degrades_unreadable_cells() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_reads_of("IMon");
        let (mut ctl, _clock) = controller(&sim);

        let table = ctl.channel_summary(0, 0).unwrap();

        assert_eq!(
            table.headers,
            ["V0Set", "I0Set", "VMon", "IMon", "Status", "Pw", "Temp"]
        );
        assert_eq!(table.cell(0, "IMon"), Some(UNREADABLE));
        assert_eq!(table.cell(0, "Pw"), Some("Off"));
        assert_eq!(table.cell(0, "I0Set"), Some("10"));
    }

    #[test]
    fn channel_info_lists_all_readable_params() {
        let sim = SimCrate::with_board(0, 1);
        sim.define_channel_param(
            0,
            0,
            "ClrAlarm",
            ParamProp::new(ParamType::OnOff, ParamMode::WriteOnly),
            ParamValue::OnOff(false),
        );
        let (mut ctl, _clock) = controller(&sim);

        let table = ctl.channel_info(0, 0, &[]).unwrap();
        assert_eq!(table.headers.len(), 20);
        assert!(!table.headers.contains(&"ClrAlarm".to_string()));
    }

    #[test]
    fn board_and_system_reports() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, _clock) = controller(&sim);

        let board = ctl.board_info(0, &[]).unwrap();
        // ClrAlarm is write-only and left out.
        assert_eq!(board.rows.len(), 3);
        assert_eq!(board.cell(1, "Param"), Some("HVMax"));
        assert_eq!(board.cell(1, "Mode"), Some("read-only"));

        let system = ctl.system_info().unwrap();
        assert_eq!(system.cell(0, "param_value"), Some("SY4527"));
    }

    #[test]
    fn crate_report_follows_filter() {
        let sim = SimCrate::new(4);
        sim.add_board(1, "A1535", 4);
        sim.add_board(3, "A1833", 2);
        sim.set_channel_value(1, 2, "VMon", ParamValue::Numeric(99.5));
        let (mut ctl, _clock) = disconnected(&sim);

        let filter = CrateFilter {
            slots: vec![1],
            channels: vec![0, 2],
            ..CrateFilter::with_params(["VMon", "Pw"])
        };
        let reports = ctl.crate_info(&filter).unwrap();

        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.slot, 1);
        assert_eq!(report.channels.headers, ["Ch", "VMon", "Pw"]);
        assert_eq!(report.channels.rows.len(), 2);
        assert_eq!(report.channels.cell(1, "Ch"), Some("2"));
        assert_eq!(report.channels.cell(1, "VMon"), Some("99.5"));
        assert!(report.params.iter().any(|(name, _)| name == "HVMax"));
        assert!(report.to_string().starts_with("Board info in slot 1 (A1535):"));
        assert_eq!(sim.open_sessions(), 0);
    }

    #[test]
    fn verbose_ramp_still_settles() {
        let sim = SimCrate::with_board(0, 1);
        preload(&sim, 0, 0, 0.0, 10.0, 10.0);
        let clock = ManualClock::new();
        let config = ControllerConfig::default()
            .with_verbose(true)
            .with_command_settle(Duration::from_secs(9));
        let mut ctl = HvController::connect_with_clock(sim.clone(), config, clock.clone()).unwrap();

        let outcome = ctl.set_channel_voltage(0, 0, 25.0).unwrap();

        // ceil(2.5) + 2, the command settle time does not apply to ramps.
        assert!(matches!(outcome, RampOutcome::Settled { .. }));
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn settle_margin_is_always_two_seconds() {
        let sim = SimCrate::with_board(0, 1);
        preload(&sim, 0, 0, 20.0, 30.0, 10.0);
        let clock = ManualClock::new();
        let config = ControllerConfig::default().with_command_settle(Duration::ZERO);
        let mut ctl = HvController::connect_with_clock(sim.clone(), config, clock.clone()).unwrap();

        ctl.set_channel_voltage(0, 0, 100.0).unwrap();

        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[test]
    fn non_finite_target_is_rejected() {
        let sim = SimCrate::with_board(0, 1);
        let (mut ctl, clock) = controller(&sim);
        sim.clear_journal();

        for target in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let result = ctl.set_channel_voltage(0, 0, target);
            assert!(matches!(result, Err(Error::NonFiniteSetpoint { .. })));
        }
        assert!(sim.journal().is_empty());
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn failed_reads_recover_once_cleared() {
        let sim = SimCrate::with_board(0, 1);
        sim.fail_reads_of("VMon");
        let (mut ctl, _clock) = controller(&sim);

        let outcome = ctl.set_channel_voltage(0, 0, 50.0).unwrap();
        assert_eq!(
            outcome,
            RampOutcome::Aborted(AbortReason::ReadingUnavailable(ChannelParam::VMon))
        );

        sim.clear_failures();
        let outcome = ctl.set_channel_voltage(0, 0, 50.0).unwrap();
        assert!(matches!(outcome, RampOutcome::Settled { .. }));
    }

    #[test]
    fn reports_survive_failed_listings() {
        let sim = SimCrate::with_board(0, 2);
        let (mut ctl, _clock) = controller(&sim);
        sim.fail_listing(true);

        // System properties fall back to the names cached at connect.
        let system = ctl.system_info().unwrap();
        assert_eq!(system.rows.len(), 3);
        assert_eq!(system.cell(2, "param_value"), Some("192.168.0.1"));

        let board = ctl.board_info(0, &[]).unwrap();
        assert!(board.rows.is_empty());

        let channel = ctl.channel_info(0, 1, &[]).unwrap();
        assert_eq!(
            channel.headers,
            ["V0Set", "I0Set", "VMon", "IMon", "Status", "Pw", "Temp"]
        );

        let reports = ctl.crate_info(&CrateFilter::default()).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].params.is_empty());
        assert_eq!(reports[0].channels.rows.len(), 2);
        assert_eq!(reports[0].channels.cell(1, "Temp"), Some("25"));
    }

    #[test]
    fn crate_report_tolerates_stale_crate_map() {
        let sim = SimCrate::with_board(0, 4);
        let (mut ctl, _clock) = controller(&sim);
        // Board swapped for a smaller one while the session stays open.
        sim.add_board(0, "A1833", 2);

        let reports = ctl.crate_info(&CrateFilter::default()).unwrap();

        let channels = &reports[0].channels;
        assert_eq!(channels.rows.len(), 4);
        assert_eq!(channels.headers.len(), 21);
        assert_eq!(channels.cell(1, "Temp"), Some("25"));
        assert_eq!(channels.cell(3, "Ch"), Some("3"));
        assert_eq!(channels.cell(3, "VMon"), Some(UNREADABLE));
    }

    #[test]
    fn hidden_system_props_are_left_out_of_reports() {
        let sim = SimCrate::with_board(0, 1);
        sim.define_system_prop(
            "Reboot",
            ParamProp::new(ParamType::OnOff, ParamMode::WriteOnly),
            ParamValue::OnOff(false),
        );
        let (mut ctl, _clock) = controller(&sim);

        let system = ctl.system_info().unwrap();

        assert_eq!(system.rows.len(), 3);
        assert!(ctl.system_props().contains(&"Reboot".to_string()));
    }
}
