//! hex framed serial transport (sonoff 4ch pro r3 dialect)
//! design
//! - every (channel, state) pair maps to a fixed four byte frame,
//!   precomputed as a hex string: A0 <channel> <state> <checksum>
//! - a pair missing from the table is a configuration error, never a
//!   runtime fallback
//! - like the line dialect there is no acknowledgment, only a settle
//!   delay after the raw bytes are written

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use data_encoding::HEXUPPER;
use lazy_static::lazy_static;
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::common::error::DriverError;
use crate::driver::io::write_serial_frame;
use crate::driver::traits::Transport;
use crate::entity::dto::relay_dto::{Channel, ChannelAddress, RelayState};
use crate::trace;

const LOG_TAG: &str = "hex_serial.rs | hex serial transport";

lazy_static! {
    /// per (channel, state) command table for the 4ch pro r3 board
    static ref RELAY_COMMANDS: HashMap<(u8, RelayState), &'static str> = {
        let mut m = HashMap::new();
        m.insert((1, RelayState::On), "A00101A2");
        m.insert((1, RelayState::Off), "A00100A1");
        m.insert((2, RelayState::On), "A00201A3");
        m.insert((2, RelayState::Off), "A00200A2");
        m.insert((3, RelayState::On), "A00301A4");
        m.insert((3, RelayState::Off), "A00300A3");
        m.insert((4, RelayState::On), "A00401A5");
        m.insert((4, RelayState::Off), "A00400A4");
        m
    };
}

/// raw frame for one relay command, decoded from the static table
pub fn command_frame(relay_number: u8, state: RelayState) -> Result<Vec<u8>, DriverError> {
    let hex = RELAY_COMMANDS.get(&(relay_number, state)).ok_or(
        DriverError::MissingCommandMapping {
            channel: relay_number,
            state: state.payload().to_string(),
        },
    )?;
    HEXUPPER
        .decode(hex.as_bytes())
        .map_err(|e| DriverError::ConfigInvalid(format!("bad hex in command table: {}", e)))
}

pub struct HexSerialTransport {
    port: Mutex<SerialStream>,
    settle_delay: Duration,
    io_timeout: Duration,
}

impl HexSerialTransport {
    /// opens the serial port, must be called inside the tokio runtime
    pub fn new(
        serial_port: &str,
        baudrate: u32,
        settle_delay: Duration,
        io_timeout: Duration,
    ) -> Result<Self, DriverError> {
        let port = tokio_serial::new(serial_port, baudrate)
            .open_native_async()
            .map_err(|e| {
                DriverError::TransportIo(format!(
                    "cannot open serial port: {}, err: {}",
                    serial_port, e
                ))
            })?;

        Ok(HexSerialTransport {
            port: Mutex::new(port),
            settle_delay,
            io_timeout,
        })
    }
}

#[async_trait]
impl Transport for HexSerialTransport {
    async fn set_state(&self, channel: &Channel, state: RelayState) -> Result<(), DriverError> {
        let relay_number = match channel.address {
            ChannelAddress::SerialChannel(n) => n,
            ref other => {
                return Err(DriverError::ConfigInvalid(format!(
                    "channel {} has non-serial address {:?} on the hex serial transport",
                    channel.id, other
                )))
            }
        };

        let frame = command_frame(relay_number, state)?;
        trace!(LOG_TAG, "write frame: {:02X?}", frame);

        {
            let mut port = self.port.lock().await;
            write_serial_frame(&mut port, frame.as_slice(), self.io_timeout).await?;
        }

        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_frame_bytes() {
        assert_eq!(
            command_frame(1, RelayState::On).unwrap(),
            vec![0xA0, 0x01, 0x01, 0xA2]
        );
        assert_eq!(
            command_frame(4, RelayState::Off).unwrap(),
            vec![0xA0, 0x04, 0x00, 0xA4]
        );
    }

    #[test]
    fn test_checksum_is_sum_of_header_and_payload() {
        for ((relay, _state), _) in RELAY_COMMANDS.iter() {
            for state in [RelayState::On, RelayState::Off] {
                let frame = command_frame(*relay, state).unwrap();
                let sum = frame[0] as u16 + frame[1] as u16 + frame[2] as u16;
                assert_eq!(frame[3], (sum & 0xFF) as u8);
            }
        }
    }

    #[test]
    fn test_missing_mapping_is_config_level() {
        let err = command_frame(5, RelayState::On).unwrap_err();
        match err {
            DriverError::MissingCommandMapping { channel, ref state } => {
                assert_eq!(channel, 5);
                assert_eq!(state, "ON");
            }
            other => panic!("expected MissingCommandMapping, got {:?}", other),
        }
        // a table miss is not fatal for the bank, only for the single command
        assert!(!err.is_fatal());
    }
}
