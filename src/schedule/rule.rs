//! schedule rules
//! exactly one rule is active per process instance

use std::time::Duration;

use chrono::NaiveTime;

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleRule {
    /// daily on/off pair; off_at may lie before on_at for overnight
    /// schedules, each transition fires independently at its own minute
    FixedDaily {
        on_at: NaiveTime,
        off_at: NaiveTime,
    },
    /// alternate on/off from process start
    Cyclic {
        on_hold: Duration,
        off_hold: Duration,
    },
}
