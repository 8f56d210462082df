//! dummy transport
//! no hardware is touched, every call is recorded in a journal. used when
//! the engine runs without relays attached, and by tests to observe the
//! exact command sequence the bank and the engine produce

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::common::error::DriverError;
use crate::driver::traits::Transport;
use crate::entity::dto::relay_dto::{Channel, RelayState};
use crate::info;

const LOG_TAG: &str = "dummy.rs | dummy transport";

pub struct DummyTransport {
    journal: Arc<Mutex<Vec<(u8, RelayState)>>>,
    // per channel injected failures
    failures: HashMap<u8, DriverError>,
}

impl DummyTransport {
    pub fn new() -> Self {
        DummyTransport {
            journal: Arc::new(Mutex::new(Vec::new())),
            failures: HashMap::new(),
        }
    }

    /// handle to the call journal, survives moving the transport into a bank
    pub fn journal(&self) -> Arc<Mutex<Vec<(u8, RelayState)>>> {
        self.journal.clone()
    }

    /// make every command for the given channel fail with the given error
    pub fn fail_channel(mut self, channel_id: u8, error: DriverError) -> Self {
        self.failures.insert(channel_id, error);
        self
    }
}

impl Default for DummyTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for DummyTransport {
    async fn set_state(&self, channel: &Channel, state: RelayState) -> Result<(), DriverError> {
        if let Ok(mut journal) = self.journal.lock() {
            journal.push((channel.id, state));
        }
        if let Some(error) = self.failures.get(&channel.id) {
            return Err(error.clone());
        }
        info!(LOG_TAG, "channel {} -> {}", channel.id, state);
        Ok(())
    }
}
