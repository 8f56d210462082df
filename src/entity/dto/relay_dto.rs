//! relay channel data objects
//! a channel is created once at configuration load and stays immutable,
//! except for the commanded state which only the bank mutates after a
//! successful (or assumed successful) transport call

use std::fmt::{self, Display, Formatter};

/// logical relay state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    /// the two literal wire payload values, shared by the mqtt and
    /// line serial dialects
    pub fn payload(&self) -> &'static str {
        match self {
            RelayState::On => "ON",
            RelayState::Off => "OFF",
        }
    }

    pub fn flipped(&self) -> RelayState {
        match self {
            RelayState::On => RelayState::Off,
            RelayState::Off => RelayState::On,
        }
    }
}

impl Display for RelayState {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.payload())
    }
}

/// transport medium a channel is wired to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Mqtt,
    LineSerial,
    HexSerial,
    Gpio,
    // no hardware, logs and records only
    Dummy,
}

/// transport specific address of one channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelAddress {
    /// mqtt topic the payload is published to
    Topic(String),
    /// relay number on the serial device, both serial dialects
    SerialChannel(u8),
    /// bcm pin number
    Pin(u8),
}

/// one addressable relay output
#[derive(Debug, Clone)]
pub struct Channel {
    /// positive, unique within the bank
    pub id: u8,
    pub kind: TransportKind,
    pub address: ChannelAddress,
    /// polarity flag, affects only the gpio transport
    pub active_low: bool,
    /// last commanded state
    pub state: RelayState,
}

impl Channel {
    pub fn new(id: u8, kind: TransportKind, address: ChannelAddress, active_low: bool) -> Self {
        Channel {
            id,
            kind,
            address,
            active_low,
            // relays are assumed off until commanded
            state: RelayState::Off,
        }
    }
}
