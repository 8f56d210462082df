//! direct gpio transport
//! design
//! - address is a bcm pin number, every pin is claimed once at
//!   construction and parked at its "off" level
//! - physical level = logical state xor the channel polarity flag
//! - no io error is expected once the pins are claimed; a failure while
//!   claiming is a GpioFault and fatal for the whole bank, gpio problems
//!   are hardware or permission issues, not transient ones

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use rppal::gpio::{Gpio, OutputPin};

use crate::common::error::DriverError;
use crate::driver::traits::Transport;
use crate::entity::dto::relay_dto::{Channel, ChannelAddress, RelayState};
use crate::debug;

const LOG_TAG: &str = "gpio.rs | gpio transport";

pub struct GpioTransport {
    pins: Mutex<HashMap<u8, OutputPin>>,
}

impl GpioTransport {
    /// claims every pin and drives it to the "off" level
    pub fn new(pin_numbers: &[u8], active_low: bool) -> Result<Self, DriverError> {
        let gpio = Gpio::new()
            .map_err(|e| DriverError::GpioFault(format!("cannot open gpio chip: {}", e)))?;

        let mut pins = HashMap::new();
        for &number in pin_numbers {
            let pin = gpio
                .get(number)
                .map_err(|e| DriverError::GpioFault(format!("cannot claim pin {}: {}", number, e)))?;
            // off level depends on polarity
            let output = if active_low {
                pin.into_output_high()
            } else {
                pin.into_output_low()
            };
            debug!(LOG_TAG, "claimed pin {} for relay output", number);
            pins.insert(number, output);
        }

        Ok(GpioTransport {
            pins: Mutex::new(pins),
        })
    }
}

#[async_trait]
impl Transport for GpioTransport {
    async fn set_state(&self, channel: &Channel, state: RelayState) -> Result<(), DriverError> {
        let number = match channel.address {
            ChannelAddress::Pin(n) => n,
            ref other => {
                return Err(DriverError::ConfigInvalid(format!(
                    "channel {} has non-pin address {:?} on the gpio transport",
                    channel.id, other
                )))
            }
        };

        let mut pins = self
            .pins
            .lock()
            .map_err(|_| DriverError::GpioFault("pin table lock poisoned".to_string()))?;
        let pin = pins
            .get_mut(&number)
            .ok_or(DriverError::GpioFault(format!("pin {} was never claimed", number)))?;

        let high = match (state, channel.active_low) {
            (RelayState::On, false) | (RelayState::Off, true) => true,
            (RelayState::On, true) | (RelayState::Off, false) => false,
        };
        if high {
            pin.set_high();
        } else {
            pin.set_low();
        }
        debug!(
            LOG_TAG,
            "pin {} driven {} for channel {} {}",
            number,
            if high { "high" } else { "low" },
            channel.id,
            state
        );
        Ok(())
    }
}
