//! network publish transport (tasmota style)
//! design
//! - address is the channel's topic, payload is exactly "ON" / "OFF"
//! - one shot session: connect, publish, disconnect on every call, no
//!   persistent session is kept. a broker outage affecting one channel
//!   therefore never holds a connection open that could stall the
//!   following channels
//! - connect and publish are wrapped in the io timeout

use std::time::Duration;

use async_trait::async_trait;
use paho_mqtt;

use crate::common::error::DriverError;
use crate::driver::io::bounded_io;
use crate::driver::traits::Transport;
use crate::entity::dto::relay_dto::{Channel, ChannelAddress, RelayState};
use crate::{debug, warn};

const LOG_TAG: &str = "mqtt.rs | mqtt publish transport";

pub struct MqttTransport {
    broker_host: String,
    broker_port: u16,
    client_id: String,
    io_timeout: Duration,
}

impl MqttTransport {
    pub fn new(broker_host: &str, broker_port: u16, client_id: &str, io_timeout: Duration) -> Self {
        MqttTransport {
            broker_host: broker_host.to_string(),
            broker_port,
            client_id: client_id.to_string(),
            io_timeout,
        }
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn set_state(&self, channel: &Channel, state: RelayState) -> Result<(), DriverError> {
        let topic = match &channel.address {
            ChannelAddress::Topic(topic) => topic.clone(),
            other => {
                return Err(DriverError::ConfigInvalid(format!(
                    "channel {} has non-topic address {:?} on the mqtt transport",
                    channel.id, other
                )))
            }
        };

        let create_opts = paho_mqtt::CreateOptionsBuilder::new()
            .server_uri(format!(
                "tcp://{}:{}",
                self.broker_host.as_str(),
                self.broker_port
            ))
            .client_id(self.client_id.as_str())
            .finalize();

        let client = paho_mqtt::AsyncClient::new(create_opts)
            .map_err(|e| DriverError::TransportIo(format!("cannot create mqtt client: {}", e)))?;

        let conn_opts = paho_mqtt::ConnectOptionsBuilder::new()
            .clean_session(true)
            .finalize();

        bounded_io(self.io_timeout, "mqtt connect", client.connect(conn_opts))
            .await?
            .map_err(|e| DriverError::TransportIo(format!("cannot connect to broker: {}", e)))?;

        let msg = paho_mqtt::Message::new(topic.as_str(), state.payload(), 0);
        let publish_result = bounded_io(self.io_timeout, "mqtt publish", client.publish(msg))
            .await
            .and_then(|r| {
                r.map_err(|e| DriverError::TransportIo(format!("mqtt publish failed: {}", e)))
            });

        // disconnect is best effort, the command already went out (or failed)
        if bounded_io(self.io_timeout, "mqtt disconnect", client.disconnect(None))
            .await
            .is_err()
        {
            warn!(LOG_TAG, "mqtt disconnect timed out, dropping client");
        }

        publish_result?;
        debug!(
            LOG_TAG,
            "published {} to {} for channel {}",
            state.payload(),
            topic,
            channel.id
        );
        Ok(())
    }
}
