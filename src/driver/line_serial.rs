//! line oriented serial transport
//! design
//! - command format is exactly "Power<N> <ON|OFF>\r\n"
//! - the dialect has no acknowledgment, success means the bytes were
//!   written without an io error, not that the device confirmed
//! - a settle delay (>= 100ms) is kept after every write to respect
//!   device timing on the shared bus
//! - the port is opened once at construction and held for the process
//!   lifetime

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::common::error::DriverError;
use crate::driver::io::write_serial_frame;
use crate::driver::traits::Transport;
use crate::entity::dto::relay_dto::{Channel, ChannelAddress, RelayState};
use crate::trace;

const LOG_TAG: &str = "line_serial.rs | line serial transport";

pub struct LineSerialTransport {
    port: Mutex<SerialStream>,
    settle_delay: Duration,
    io_timeout: Duration,
}

impl LineSerialTransport {
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

        Ok(LineSerialTransport {
            port: Mutex::new(port),
            settle_delay,
            io_timeout,
        })
    }

    /// command line for one relay, CR LF terminated
    pub fn build_command(relay_number: u8, state: RelayState) -> String {
        format!("Power{} {}\r\n", relay_number, state.payload())
    }
}

#[async_trait]
impl Transport for LineSerialTransport {
    async fn set_state(&self, channel: &Channel, state: RelayState) -> Result<(), DriverError> {
        let relay_number = match channel.address {
            ChannelAddress::SerialChannel(n) => n,
            ref other => {
                return Err(DriverError::ConfigInvalid(format!(
                    "channel {} has non-serial address {:?} on the line serial transport",
                    channel.id, other
                )))
            }
        };

        let line = Self::build_command(relay_number, state);
        trace!(LOG_TAG, "write line: {:?}", line);

        {
            let mut port = self.port.lock().await;
            write_serial_frame(&mut port, line.as_bytes(), self.io_timeout).await?;
        }

        // settle before the next command may touch the bus
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_command() {
        assert_eq!(
            LineSerialTransport::build_command(3, RelayState::On),
            "Power3 ON\r\n"
        );
        assert_eq!(
            LineSerialTransport::build_command(1, RelayState::Off),
            "Power1 OFF\r\n"
        );
    }
}
