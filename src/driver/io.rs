//! shared io helpers for the transports
//! every network and serial await goes through bounded_io so a dead
//! broker or bus becomes one failed command instead of a stalled engine

use std::future::Future;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::timeout;
use tokio_serial::SerialStream;

use crate::common::error::DriverError;

/// races an io future against the configured limit; expiry is a
/// TransportIo failure for that single command
pub async fn bounded_io<F>(
    limit: Duration,
    what: &str,
    future: F,
) -> Result<F::Output, DriverError>
where
    F: Future,
{
    timeout(limit, future)
        .await
        .map_err(|_| DriverError::TransportIo(format!("{} timed out after {:?}", what, limit)))
}

/// writes one raw frame to the serial port, shared by both serial
/// dialects so there is exactly one write/flush path
pub async fn write_serial_frame(
    port: &mut SerialStream,
    frame: &[u8],
    limit: Duration,
) -> Result<(), DriverError> {
    bounded_io(limit, "serial write", port.write_all(frame))
        .await?
        .map_err(|e| DriverError::TransportIo(format!("serial write failed: {}", e)))?;
    bounded_io(limit, "serial flush", port.flush())
        .await?
        .map_err(|e| DriverError::TransportIo(format!("serial flush failed: {}", e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test]
    async fn test_never_resolving_io_becomes_transport_io() {
        let err = bounded_io(Duration::from_millis(10), "mqtt connect", pending::<()>())
            .await
            .unwrap_err();
        match err {
            DriverError::TransportIo(ref msg) => {
                assert!(msg.contains("mqtt connect"));
                assert!(msg.contains("timed out"));
            }
            ref other => panic!("expected TransportIo, got {:?}", other),
        }
        // a timed out command is one failed outcome, the loop continues
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_prompt_io_passes_through() {
        let value = bounded_io(Duration::from_millis(50), "mqtt publish", async { 7u8 })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
