//! Connection state of a controller and the open/close transitions between states.
//!
//! ```text
//! Closed --open--> Open --close--> Closed
//! Open --dispatch(until)--> Closed(refuse until) --time passes--> Closed
//! ```
//!
//! A failed open leaves the state closed. Opening while dispatched fails without calling the
//! vendor.

use std::time::SystemTime;

use log::{debug, warn};

use crate::{
    error::{Error, VendorError, VendorErrorCode},
    vendor::Session,
};

/// Vendor messages meaning the link was already gone when we tried to close it.
///
/// Only consulted when the vendor error carries no structured code. Not exhaustive.
const ALREADY_DOWN_MESSAGES: [&str; 3] = ["NOTCONNECTED", "Connection failed", "CFE server down"];

#[derive(Debug)]
pub enum ConnectionState<S> {
    Closed {
        /// Reopening is refused before this time.
        refuse_until: Option<SystemTime>,
    },
    Open(S),
}

impl<S> Default for ConnectionState<S> {
    fn default() -> Self {
        ConnectionState::Closed { refuse_until: None }
    }
}

/// How closing a session went. Closing never fails, this is only a diagnostic.
#[derive(Debug)]
pub enum Disconnect<E> {
    /// There was no open session.
    NotOpen,
    Closed,
    /// The vendor reported the link as already down.
    AlreadyDown(E),
    Failed(E),
}

impl<E> Disconnect<E> {
    /// Whether the session is known to have been closed without trouble.
    pub fn is_clean(&self) -> bool {
        matches!(self, Disconnect::NotOpen | Disconnect::Closed)
    }
}

impl<S: Session> ConnectionState<S> {
    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open(_))
    }

    pub fn session_mut(&mut self) -> Option<&mut S> {
        match self {
            ConnectionState::Open(session) => Some(session),
            ConnectionState::Closed { .. } => None,
        }
    }

    /// The end of the dispatch window, if one is still running at `now`.
    pub fn dispatched_until(&self, now: SystemTime) -> Option<SystemTime> {
        match *self {
            ConnectionState::Closed {
                refuse_until: Some(until),
            } if now < until => Some(until),
            _ => None,
        }
    }

    /// Open a session using `open`, unless one is already open.
    pub fn open_with(
        &mut self,
        now: SystemTime,
        open: impl FnOnce() -> Result<S, S::Error>,
    ) -> Result<(), Error<S::Error>> {
        if self.is_open() {
            return Ok(());
        }
        if let Some(until) = self.dispatched_until(now) {
            return Err(Error::Dispatched { until });
        }
        match open() {
            Ok(session) => {
                debug!("Session opened");
                *self = ConnectionState::Open(session);
                Ok(())
            }
            Err(e) => {
                *self = ConnectionState::Closed { refuse_until: None };
                Err(Error::ConnectFailure(e))
            }
        }
    }

    /// Close the session if one is open. Closing a closed connection is a no-op.
    pub fn close(&mut self) -> Disconnect<S::Error> {
        let session = match core::mem::take(self) {
            ConnectionState::Open(session) => session,
            closed @ ConnectionState::Closed { .. } => {
                *self = closed;
                return Disconnect::NotOpen;
            }
        };

        match session.close() {
            Ok(()) => {
                debug!("Session closed");
                Disconnect::Closed
            }
            Err(e) if is_already_down(&e) => {
                debug!("Session already down while closing: {e}");
                Disconnect::AlreadyDown(e)
            }
            Err(e) => {
                warn!("Error while closing session: {e}");
                Disconnect::Failed(e)
            }
        }
    }

    /// Close the session and refuse to reopen before `until`.
    pub fn dispatch(&mut self, until: SystemTime) -> Disconnect<S::Error> {
        let outcome = self.close();
        *self = ConnectionState::Closed {
            refuse_until: Some(until),
        };
        outcome
    }
}

/// Whether a close error only says the link was already gone.
///
/// Structured vendor codes win, message matching is the fallback.
pub fn is_already_down<E: VendorError>(err: &E) -> bool {
    match err.code() {
        Some(code) => matches!(
            code,
            VendorErrorCode::NotConnected
                | VendorErrorCode::ConnectionFailed
                | VendorErrorCode::ServerDown
        ),
        None => {
            let message = err.to_string();
            ALREADY_DOWN_MESSAGES.iter().any(|m| message.contains(m))
        }
    }
}
