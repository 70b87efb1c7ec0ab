//! Controller configuration.

use std::time::Duration;

use strum::IntoEnumIterator;
use thiserror::Error;

use crate::types::{LinkType, SystemType};

/// Where to find the crate, how to log in, and the controller's waiting policy.
#[derive(Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    pub system_type: SystemType,
    pub link_type: LinkType,
    /// Link dependent address, an IP address for TCP/IP.
    pub address: String,
    pub username: String,
    pub password: String,
    /// Log a channel report after each ramp.
    pub verbose: bool,
    /// Wait after power switching and channel configuration.
    pub command_settle: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            system_type: SystemType::default(),
            link_type: LinkType::default(),
            address: "192.168.0.1".to_owned(),
            username: "admin".to_owned(),
            password: "admin".to_owned(),
            verbose: false,
            command_settle: Duration::from_secs(2),
        }
    }
}

// Keep the password out of logs.
impl core::fmt::Debug for ControllerConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ControllerConfig")
            .field("system_type", &self.system_type)
            .field("link_type", &self.link_type)
            .field("address", &self.address)
            .field("username", &self.username)
            .field("password", &"***")
            .field("verbose", &self.verbose)
            .field("command_settle", &self.command_settle)
            .finish()
    }
}

impl ControllerConfig {
    pub fn new(system_type: SystemType, link_type: LinkType, address: impl Into<String>) -> Self {
        Self {
            system_type,
            link_type,
            address: address.into(),
            ..Default::default()
        }
    }

    /// Build a configuration from vendor system and link type names, e.g. `"SY4527"`, `"TCPIP"`.
    pub fn parse(system: &str, link: &str, address: impl Into<String>) -> Result<Self, ConfigError> {
        let system_type = system
            .parse::<SystemType>()
            .map_err(|_| ConfigError::UnknownSystemType {
                given: system.to_owned(),
                choices: choices::<SystemType>(),
            })?;
        let link_type = link
            .parse::<LinkType>()
            .map_err(|_| ConfigError::UnknownLinkType {
                given: link.to_owned(),
                choices: choices::<LinkType>(),
            })?;
        Ok(Self::new(system_type, link_type, address))
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_command_settle(mut self, wait: Duration) -> Self {
        self.command_settle = wait;
        self
    }
}

fn choices<T: IntoEnumIterator + core::fmt::Display>() -> String {
    T::iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ")
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown system type {given}; available choices: {choices}")]
    UnknownSystemType { given: String, choices: String },
    #[error("Unknown link type {given}; available choices: {choices}")]
    UnknownLinkType { given: String, choices: String },
}
