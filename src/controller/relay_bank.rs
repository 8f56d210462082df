//! relay bank controller
//! design
//! - owns the ordered channel list (ascending id) and one transport per
//!   medium in use, every channel maps to exactly one transport
//! - set_all paces commands with an inter channel delay so a shared bus
//!   is never flooded, and never short circuits on a single failure:
//!   partial success is a normal outcome, the caller counts successes
//! - commanded state is only updated after a successful transport call

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::common::error::DriverError;
use crate::driver::traits::Transport;
use crate::entity::dto::outcome_dto::CommandOutcome;
use crate::entity::dto::relay_dto::{Channel, ChannelAddress, RelayState, TransportKind};
use crate::warn;

const LOG_TAG: &str = "relay_bank.rs | relay bank controller";

pub struct RelayBank {
    // ascending channel id order
    channels: Vec<Channel>,
    transports: HashMap<TransportKind, Box<dyn Transport + Send + Sync>>,
    inter_channel_delay: Duration,
}

impl std::fmt::Debug for RelayBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayBank")
            .field("channels", &self.channels)
            .field("inter_channel_delay", &self.inter_channel_delay)
            .finish_non_exhaustive()
    }
}

impl RelayBank {
    /// validates the topology before the bank accepts any command
    pub fn new(
        mut channels: Vec<Channel>,
        transports: HashMap<TransportKind, Box<dyn Transport + Send + Sync>>,
        inter_channel_delay: Duration,
    ) -> Result<Self, DriverError> {
        if channels.is_empty() {
            return Err(DriverError::ConfigInvalid(
                "relay bank needs at least one channel".to_string(),
            ));
        }

        let mut seen: HashSet<u8> = HashSet::new();
        for channel in channels.iter() {
            if channel.id == 0 {
                return Err(DriverError::ConfigInvalid(
                    "channel ids start at 1".to_string(),
                ));
            }
            if !seen.insert(channel.id) {
                return Err(DriverError::ConfigInvalid(format!(
                    "duplicate channel id: {}",
                    channel.id
                )));
            }
            if !transports.contains_key(&channel.kind) {
                return Err(DriverError::ConfigInvalid(format!(
                    "channel {} uses {:?} but no such transport is mounted",
                    channel.id, channel.kind
                )));
            }
            let address_fits = matches!(
                (&channel.kind, &channel.address),
                (TransportKind::Mqtt, ChannelAddress::Topic(_))
                    | (TransportKind::LineSerial, ChannelAddress::SerialChannel(_))
                    | (TransportKind::HexSerial, ChannelAddress::SerialChannel(_))
                    | (TransportKind::Gpio, ChannelAddress::Pin(_))
                    | (TransportKind::Dummy, _)
            );
            if !address_fits {
                return Err(DriverError::ConfigInvalid(format!(
                    "channel {} address {:?} does not fit transport {:?}",
                    channel.id, channel.address, channel.kind
                )));
            }
        }

        channels.sort_by_key(|c| c.id);

        Ok(RelayBank {
            channels,
            transports,
            inter_channel_delay,
        })
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// last commanded state per channel, ascending id order
    pub fn states(&self) -> Vec<(u8, RelayState)> {
        self.channels.iter().map(|c| (c.id, c.state)).collect()
    }

    /// commands one channel, one attempt, no retry
    ///
    /// a transport io error or a table miss becomes a failed outcome; a
    /// fatal error (gpio fault) is propagated instead so the caller can
    /// stop the bank
    pub async fn set_channel(
        &mut self,
        channel_id: u8,
        state: RelayState,
    ) -> Result<CommandOutcome, DriverError> {
        let index = self
            .channels
            .iter()
            .position(|c| c.id == channel_id)
            .ok_or(DriverError::UnknownChannel(channel_id))?;
        let channel = self.channels[index].clone();
        let transport = self
            .transports
            .get(&channel.kind)
            .ok_or(DriverError::UnknownChannel(channel_id))?;

        match transport.set_state(&channel, state).await {
            Ok(()) => {
                self.channels[index].state = state;
                Ok(CommandOutcome::success(channel_id, state))
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(LOG_TAG, "channel {} command failed: {}", channel_id, e);
                Ok(CommandOutcome::failure(channel_id, state, e.to_string()))
            }
        }
    }

    /// flips one channel relative to its last commanded state
    pub async fn toggle(&mut self, channel_id: u8) -> Result<CommandOutcome, DriverError> {
        let current = self
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .ok_or(DriverError::UnknownChannel(channel_id))?
            .state;
        self.set_channel(channel_id, current.flipped()).await
    }

    /// commands every channel in ascending id order
    ///
    /// the inter channel delay is raced against the cancellation token;
    /// on cancellation the outcomes gathered so far are returned and the
    /// remaining channels are left for the shutdown path
    pub async fn set_all(
        &mut self,
        state: RelayState,
        cancel: &CancellationToken,
    ) -> Result<Vec<CommandOutcome>, DriverError> {
        let ids: Vec<u8> = self.channels.iter().map(|c| c.id).collect();
        let mut outcomes = Vec::with_capacity(ids.len());

        for (i, id) in ids.iter().enumerate() {
            outcomes.push(self.set_channel(*id, state).await?);
            if i + 1 < ids.len() {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(self.inter_channel_delay) => {}
                }
            }
        }

        Ok(outcomes)
    }
}
