//! result of a single transport call, consumed by logging only

use chrono::{DateTime, Local};

use super::relay_dto::RelayState;

#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub channel_id: u8,
    pub requested_state: RelayState,
    pub success: bool,
    pub error_detail: Option<String>,
    pub timestamp: DateTime<Local>,
}

impl CommandOutcome {
    pub fn success(channel_id: u8, requested_state: RelayState) -> Self {
        CommandOutcome {
            channel_id,
            requested_state,
            success: true,
            error_detail: None,
            timestamp: Local::now(),
        }
    }

    pub fn failure(channel_id: u8, requested_state: RelayState, detail: String) -> Self {
        CommandOutcome {
            channel_id,
            requested_state,
            success: false,
            error_detail: Some(detail),
            timestamp: Local::now(),
        }
    }
}
