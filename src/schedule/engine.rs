//! schedule engine
//! design
//! - one cooperative control loop, one decision or action at a time, so
//!   "all channels" commands always go out in a stable observable order
//! - the concrete transport is picked at configuration load, the loop
//!   only ever talks to the bank
//! - fixed daily transitions are deduplicated by a last-fired date per
//!   transition, checked on every poll; cancellation latency is bounded
//!   by the poll interval, never by a fire suppression sleep
//! - every wait races the cancellation token; on cancellation the engine
//!   forces exactly one best effort all-off and halts

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use tokio_util::sync::CancellationToken;

use crate::common::error::DriverError;
use crate::controller::relay_bank::RelayBank;
use crate::entity::dto::outcome_dto::CommandOutcome;
use crate::entity::dto::relay_dto::RelayState;
use crate::schedule::clock::Clock;
use crate::schedule::rule::ScheduleRule;
use crate::{debug, error, info, warn};

const LOG_TAG: &str = "engine.rs | schedule engine";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Evaluating,
    CommandingOn,
    HoldingOn,
    CommandingOff,
    HoldingOff,
    ShuttingDown,
}

pub struct ScheduleEngine<C: Clock> {
    bank: RelayBank,
    rule: ScheduleRule,
    /// idle wait between fixed mode evaluations
    poll_interval: Duration,
    clock: C,
    cancel: CancellationToken,
    state: EngineState,
    // fixed mode: date each transition last fired, one entry per day
    last_on_fired: Option<NaiveDate>,
    last_off_fired: Option<NaiveDate>,
    // cyclic mode: which command the next evaluation issues
    cyclic_next_on: bool,
}

impl<C: Clock> ScheduleEngine<C> {
    pub fn new(
        bank: RelayBank,
        rule: ScheduleRule,
        poll_interval: Duration,
        clock: C,
        cancel: CancellationToken,
    ) -> Self {
        ScheduleEngine {
            bank,
            rule,
            poll_interval,
            clock,
            cancel,
            state: EngineState::Idle,
            last_on_fired: None,
            last_off_fired: None,
            cyclic_next_on: true,
        }
    }

    /// runs until cancelled or a fatal bank error, then forces all-off
    pub async fn run(&mut self) -> Result<(), DriverError> {
        let mut fatal: Option<DriverError> = None;

        loop {
            if self.cancel.is_cancelled() && self.state != EngineState::ShuttingDown {
                info!(LOG_TAG, "cancellation received");
                self.transition(EngineState::ShuttingDown);
            }

            match self.state {
                EngineState::Idle => self.transition(EngineState::Evaluating),

                EngineState::Evaluating => self.evaluate().await,

                EngineState::CommandingOn => match self.command_all(RelayState::On).await {
                    Ok(()) => self.transition(EngineState::HoldingOn),
                    Err(e) => {
                        error!(LOG_TAG, "fatal bank error while commanding on: {}", e);
                        fatal = Some(e);
                        self.transition(EngineState::ShuttingDown);
                    }
                },

                EngineState::CommandingOff => match self.command_all(RelayState::Off).await {
                    Ok(()) => self.transition(EngineState::HoldingOff),
                    Err(e) => {
                        error!(LOG_TAG, "fatal bank error while commanding off: {}", e);
                        fatal = Some(e);
                        self.transition(EngineState::ShuttingDown);
                    }
                },

                EngineState::HoldingOn => {
                    self.wait(self.hold_duration(RelayState::On)).await;
                    if !self.cancel.is_cancelled() {
                        self.transition(EngineState::Evaluating);
                    }
                }

                EngineState::HoldingOff => {
                    self.wait(self.hold_duration(RelayState::Off)).await;
                    if !self.cancel.is_cancelled() {
                        self.transition(EngineState::Evaluating);
                    }
                }

                EngineState::ShuttingDown => {
                    self.shutdown().await;
                    break;
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn evaluate(&mut self) {
        match self.rule.clone() {
            ScheduleRule::FixedDaily { on_at, off_at } => {
                let now = self.clock.now();
                if Self::due(now, on_at, &mut self.last_on_fired) {
                    info!(LOG_TAG, "daily on time {} reached", on_at);
                    self.transition(EngineState::CommandingOn);
                } else if Self::due(now, off_at, &mut self.last_off_fired) {
                    info!(LOG_TAG, "daily off time {} reached", off_at);
                    self.transition(EngineState::CommandingOff);
                } else {
                    self.wait(self.poll_interval).await;
                }
            }
            ScheduleRule::Cyclic { .. } => {
                // alternates unconditionally
                if self.cyclic_next_on {
                    self.transition(EngineState::CommandingOn);
                } else {
                    self.transition(EngineState::CommandingOff);
                }
                self.cyclic_next_on = !self.cyclic_next_on;
            }
        }
    }

    /// true at most once per calendar day per transition
    fn due(now: NaiveDateTime, at: NaiveTime, last_fired: &mut Option<NaiveDate>) -> bool {
        let time = now.time();
        if time.hour() == at.hour()
            && time.minute() == at.minute()
            && *last_fired != Some(now.date())
        {
            *last_fired = Some(now.date());
            return true;
        }
        false
    }

    async fn command_all(&mut self, state: RelayState) -> Result<(), DriverError> {
        let cancel = self.cancel.clone();
        let outcomes = self.bank.set_all(state, &cancel).await?;
        Self::log_outcomes(state, &outcomes);
        Ok(())
    }

    fn hold_duration(&self, state: RelayState) -> Duration {
        match self.rule {
            // fixed mode holds until the next poll tick
            ScheduleRule::FixedDaily { .. } => self.poll_interval,
            ScheduleRule::Cyclic { on_hold, off_hold } => match state {
                RelayState::On => on_hold,
                RelayState::Off => off_hold,
            },
        }
    }

    /// interruptible wait, returns early on cancellation
    async fn wait(&self, duration: Duration) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(duration) => {}
        }
    }

    /// best effort all-off, runs exactly once per engine lifetime, with
    /// a token of its own so nothing can interrupt it
    async fn shutdown(&mut self) {
        info!(LOG_TAG, "shutting down, forcing all channels off");
        let off_cancel = CancellationToken::new();
        match self.bank.set_all(RelayState::Off, &off_cancel).await {
            Ok(outcomes) => Self::log_outcomes(RelayState::Off, &outcomes),
            Err(e) => error!(LOG_TAG, "all-off on shutdown failed: {}", e),
        }
    }

    fn log_outcomes(state: RelayState, outcomes: &[CommandOutcome]) {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        info!(
            LOG_TAG,
            "set all channels {}: {}/{} succeeded",
            state,
            succeeded,
            outcomes.len()
        );
        for outcome in outcomes.iter().filter(|o| !o.success) {
            warn!(
                LOG_TAG,
                "channel {} {} failed at {}: {}",
                outcome.channel_id,
                outcome.requested_state,
                outcome.timestamp.format("%H:%M:%S"),
                outcome.error_detail.as_deref().unwrap_or("unknown")
            );
        }
    }

    fn transition(&mut self, next: EngineState) {
        debug!(LOG_TAG, "state transition: {:?} -> {:?}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use crate::common::logger::init_logger;
    use crate::controller::relay_bank::RelayBank;
    use crate::driver::dummy::DummyTransport;
    use crate::driver::traits::Transport;
    use crate::entity::dto::relay_dto::{Channel, ChannelAddress, TransportKind};
    use crate::schedule::clock::{ManualClock, SystemClock};

    fn set_env() {
        let _ = init_logger();
    }

    type Journal = Arc<Mutex<Vec<(u8, RelayState)>>>;

    fn dummy_bank(channel_count: u8, transport: DummyTransport) -> (RelayBank, Journal) {
        let journal = transport.journal();
        let channels: Vec<Channel> = (1..=channel_count)
            .map(|id| {
                Channel::new(
                    id,
                    TransportKind::Dummy,
                    ChannelAddress::SerialChannel(id),
                    false,
                )
            })
            .collect();
        let mut transports: HashMap<TransportKind, Box<dyn Transport + Send + Sync>> =
            HashMap::new();
        transports.insert(TransportKind::Dummy, Box::new(transport));
        let bank = RelayBank::new(channels, transports, Duration::from_millis(1)).unwrap();
        (bank, journal)
    }

    fn ascending(states: &[(u8, RelayState)], expected: RelayState, count: u8) -> bool {
        states.len() == count as usize
            && states
                .iter()
                .enumerate()
                .all(|(i, (id, state))| *id == i as u8 + 1 && *state == expected)
    }

    #[tokio::test]
    async fn test_cyclic_rule_alternates_in_order() {
        set_env();
        let (bank, journal) = dummy_bank(4, DummyTransport::new());
        let cancel = CancellationToken::new();
        let mut engine = ScheduleEngine::new(
            bank,
            ScheduleRule::Cyclic {
                on_hold: Duration::from_millis(30),
                off_hold: Duration::from_millis(30),
            },
            Duration::from_millis(5),
            SystemClock,
            cancel.clone(),
        );

        let handle = tokio::spawn(async move { engine.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine must stop promptly after cancellation")
            .unwrap()
            .unwrap();

        let journal = journal.lock().unwrap();
        // first cycle: all on, then all off, ascending ids both times
        assert!(ascending(&journal[0..4], RelayState::On, 4));
        assert!(ascending(&journal[4..8], RelayState::Off, 4));
        // shutdown always ends with a full all-off pass
        assert!(ascending(&journal[journal.len() - 4..], RelayState::Off, 4));
    }

    #[tokio::test]
    async fn test_cancel_mid_hold_forces_single_all_off() {
        set_env();
        let (bank, journal) = dummy_bank(4, DummyTransport::new());
        let cancel = CancellationToken::new();
        let mut engine = ScheduleEngine::new(
            bank,
            ScheduleRule::Cyclic {
                // long holds, cancellation lands inside HoldingOn
                on_hold: Duration::from_secs(600),
                off_hold: Duration::from_secs(600),
            },
            Duration::from_millis(5),
            SystemClock,
            cancel.clone(),
        );

        let handle = tokio::spawn(async move { engine.run().await });
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
        // the engine must notice well before the 600s hold elapses
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine must stop promptly after cancellation")
            .unwrap()
            .unwrap();

        let journal = journal.lock().unwrap();
        assert!(ascending(&journal[0..4], RelayState::On, 4));
        // exactly one all-off, never zero, never more than one
        assert!(ascending(&journal[4..8], RelayState::Off, 4));
        assert_eq!(journal.len(), 8);
    }

    #[tokio::test]
    async fn test_fixed_rule_fires_once_per_day() {
        set_env();
        let (bank, journal) = dummy_bank(2, DummyTransport::new());
        let cancel = CancellationToken::new();
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2025, 3, 10)
                .unwrap()
                .and_hms_opt(8, 30, 5)
                .unwrap(),
        );
        let mut engine = ScheduleEngine::new(
            bank,
            ScheduleRule::FixedDaily {
                on_at: NaiveTime::from_hms_opt(8, 30, 0).unwrap(),
                off_at: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            },
            // polled every few milliseconds through the trigger minute
            Duration::from_millis(5),
            clock.clone(),
            cancel.clone(),
        );

        let handle = tokio::spawn(async move { engine.run().await });
        tokio::time::sleep(Duration::from_millis(60)).await;

        // many polls inside 08:30, the on transition fired exactly once
        assert_eq!(
            journal
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, s)| *s == RelayState::On)
                .count(),
            2
        );

        // next day, same minute: fires again
        clock.set(
            NaiveDate::from_ymd_opt(2025, 3, 11)
                .unwrap()
                .and_hms_opt(8, 30, 5)
                .unwrap(),
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(
            journal
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, s)| *s == RelayState::On)
                .count(),
            4
        );

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("engine must stop promptly after cancellation")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_gpio_fault_is_fatal_for_the_engine() {
        set_env();
        let transport = DummyTransport::new()
            .fail_channel(1, DriverError::GpioFault("pin claim lost".to_string()));
        let (bank, _journal) = dummy_bank(2, transport);
        let cancel = CancellationToken::new();
        let mut engine = ScheduleEngine::new(
            bank,
            ScheduleRule::Cyclic {
                on_hold: Duration::from_millis(10),
                off_hold: Duration::from_millis(10),
            },
            Duration::from_millis(5),
            SystemClock,
            cancel,
        );

        let result = tokio::time::timeout(Duration::from_secs(1), engine.run())
            .await
            .expect("a fatal error must stop the engine without external cancellation");
        assert!(matches!(result, Err(DriverError::GpioFault(_))));
    }
}
