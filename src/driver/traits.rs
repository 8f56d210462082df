//! capability contract shared by all relay transports

use async_trait::async_trait;

use crate::common::error::DriverError;
use crate::entity::dto::relay_dto::{Channel, RelayState};

/// a medium specific way of delivering an on/off command to one channel
///
/// every call is synchronous from the caller's point of view: it returns
/// within the configured settle delay plus io latency, one attempt, no
/// retries. network and serial io is bounded by the io timeout so a dead
/// broker or bus cannot stall the engine.
#[async_trait]
pub trait Transport {
    async fn set_state(&self, channel: &Channel, state: RelayState) -> Result<(), DriverError>;
}
