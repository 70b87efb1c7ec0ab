//! The seam to the vendor HV wrapper library.
//!
//! Everything that talks to hardware lives behind these two traits. Slots and channels are the
//! vendor's own indices.

use crate::{
    error::VendorError,
    types::{BoardInfo, LinkType, ParamProp, ParamValue, SystemType},
};

/// Opens sessions to a crate.
pub trait Connector {
    type Session: Session;

    fn open(
        &mut self,
        system: SystemType,
        link: LinkType,
        address: &str,
        username: &str,
        password: &str,
    ) -> Result<Self::Session, SessionError<Self>>;
}

/// Error type of the sessions a [`Connector`] opens.
pub type SessionError<C> = <<C as Connector>::Session as Session>::Error;

/// An open session to a crate controller.
pub trait Session {
    type Error: VendorError;

    /// Close the session. The handle is consumed whether or not this succeeds.
    fn close(self) -> Result<(), Self::Error>;

    /// One entry per slot, `None` for empty slots.
    fn crate_map(&mut self) -> Result<Vec<Option<BoardInfo>>, Self::Error>;

    fn sys_prop_list(&mut self) -> Result<Vec<String>, Self::Error>;
    fn sys_prop_info(&mut self, name: &str) -> Result<ParamProp, Self::Error>;
    fn sys_prop(&mut self, name: &str) -> Result<ParamValue, Self::Error>;
    fn set_sys_prop(&mut self, name: &str, value: &ParamValue) -> Result<(), Self::Error>;

    fn bd_param_info(&mut self, slot: u16) -> Result<Vec<String>, Self::Error>;
    fn bd_param_prop(&mut self, slot: u16, name: &str) -> Result<ParamProp, Self::Error>;
    fn bd_param(&mut self, slot: u16, name: &str) -> Result<ParamValue, Self::Error>;
    fn set_bd_param(&mut self, slot: u16, name: &str, value: &ParamValue)
    -> Result<(), Self::Error>;

    fn ch_param_info(&mut self, slot: u16, channel: u16) -> Result<Vec<String>, Self::Error>;
    fn ch_param_prop(
        &mut self,
        slot: u16,
        channel: u16,
        name: &str,
    ) -> Result<ParamProp, Self::Error>;
    fn ch_param(&mut self, slot: u16, channel: u16, name: &str)
    -> Result<ParamValue, Self::Error>;
    fn set_ch_param(
        &mut self,
        slot: u16,
        channel: u16,
        name: &str,
        value: &ParamValue,
    ) -> Result<(), Self::Error>;

    /// Ask the vendor to push change events for these channel parameters.
    fn subscribe_ch_params(
        &mut self,
        slot: u16,
        channel: u16,
        names: &[&str],
    ) -> Result<(), Self::Error>;
}
