use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fmt;

/// Driver level errors for the relay engine.
/// The taxonomy decides how the bank and the engine react:
/// - TransportIo / MissingCommandMapping: the single command failed, the loop continues
/// - UnknownChannel / ConfigInvalid: structural misconfiguration, fatal at startup
/// - GpioFault: physical pin problem, fatal for the whole bank
#[derive(Debug, Clone)]
pub enum DriverError {
    // network or serial failure while issuing a command
    TransportIo(String),
    // channel id not registered in the bank
    UnknownChannel(u8),
    // structural misconfiguration, the loop never starts
    ConfigInvalid(String),
    // no hex frame known for this (channel, state) pair
    MissingCommandMapping { channel: u8, state: String },
    // physical pin operation failure
    GpioFault(String),
}

impl DriverError {
    /// fatal errors abort the bank instead of being counted as one failed command
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::UnknownChannel(_)
                | DriverError::ConfigInvalid(_)
                | DriverError::GpioFault(_)
        )
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DriverError::TransportIo(msg) => write!(f, "transport io error, msg: {}", msg),
            DriverError::UnknownChannel(channel) => {
                write!(f, "unknown channel id: {}", channel)
            }
            DriverError::ConfigInvalid(msg) => write!(f, "invalid configuration, msg: {}", msg),
            DriverError::MissingCommandMapping { channel, state } => write!(
                f,
                "no command mapping for channel: {} state: {}",
                channel, state
            ),
            DriverError::GpioFault(msg) => write!(f, "gpio fault, msg: {}", msg),
        }
    }
}

impl Error for DriverError {}
