//! factory turning the settings file into a resolved relay bank and
//! schedule rule. the core never reads settings directly: everything is
//! validated here once and fails fast with ConfigInvalid

use std::collections::HashMap;
use std::time::Duration;

use chrono::NaiveTime;

use crate::common::error::DriverError;
use crate::common::setting::Settings;
use crate::controller::relay_bank::RelayBank;
use crate::driver::dummy::DummyTransport;
use crate::driver::gpio::GpioTransport;
use crate::driver::hex_serial::HexSerialTransport;
use crate::driver::line_serial::LineSerialTransport;
use crate::driver::mqtt::MqttTransport;
use crate::driver::traits::Transport;
use crate::entity::dto::relay_dto::{Channel, ChannelAddress, TransportKind};
use crate::info;
use crate::schedule::rule::ScheduleRule;

const LOG_TAG: &str = "factory.rs | bank and rule factory";

pub fn parse_transport_kind(value: &str) -> Result<TransportKind, DriverError> {
    match value {
        "mqtt" => Ok(TransportKind::Mqtt),
        "line_serial" => Ok(TransportKind::LineSerial),
        "hex_serial" => Ok(TransportKind::HexSerial),
        "gpio" => Ok(TransportKind::Gpio),
        "dummy" => Ok(TransportKind::Dummy),
        other => Err(DriverError::ConfigInvalid(format!(
            "unknown transport kind: {}",
            other
        ))),
    }
}

pub fn parse_clock_time(value: &str) -> Result<NaiveTime, DriverError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| DriverError::ConfigInvalid(format!("bad clock time {:?}: {}", value, e)))
}

/// builds the channel list and mounts the single transport in use
///
/// must run inside the tokio runtime, the serial transports open their
/// port here
pub fn make_bank(settings: &Settings) -> Result<RelayBank, DriverError> {
    let kind = parse_transport_kind(settings.relay.transport.as_str())?;
    let count = settings.relay.channel_count;
    if count == 0 {
        return Err(DriverError::ConfigInvalid(
            "relay.channel_count must be at least 1".to_string(),
        ));
    }

    let mut channels: Vec<Channel> = Vec::with_capacity(count as usize);
    for id in 1..=count {
        let address = match kind {
            TransportKind::Mqtt => ChannelAddress::Topic(format!(
                "{}{}",
                settings.mqtt.topic_prefix.as_str(),
                id
            )),
            TransportKind::LineSerial | TransportKind::HexSerial | TransportKind::Dummy => {
                ChannelAddress::SerialChannel(id)
            }
            TransportKind::Gpio => {
                let pin = settings
                    .gpio
                    .pins
                    .get(id as usize - 1)
                    .copied()
                    .ok_or(DriverError::ConfigInvalid(format!(
                        "channel {} lacks a gpio pin, gpio.pins has {} entries",
                        id,
                        settings.gpio.pins.len()
                    )))?;
                ChannelAddress::Pin(pin)
            }
        };
        channels.push(Channel::new(id, kind, address, settings.relay.active_low));
    }

    // serial dialects rely on the settle delay to respect device timing
    if matches!(kind, TransportKind::LineSerial | TransportKind::HexSerial)
        && settings.timing.settle_ms < 100
    {
        return Err(DriverError::ConfigInvalid(format!(
            "timing.settle_ms is {}, serial transports need at least 100",
            settings.timing.settle_ms
        )));
    }

    let settle_delay = Duration::from_millis(settings.timing.settle_ms);
    let io_timeout = Duration::from_millis(settings.timing.io_timeout_ms);
    let transport: Box<dyn Transport + Send + Sync> = match kind {
        TransportKind::Mqtt => Box::new(MqttTransport::new(
            settings.mqtt.broker_host.as_str(),
            settings.mqtt.broker_port,
            settings.mqtt.client_id.as_str(),
            io_timeout,
        )),
        TransportKind::LineSerial => Box::new(LineSerialTransport::new(
            settings.serial.port.as_str(),
            settings.serial.baudrate,
            settle_delay,
            io_timeout,
        )?),
        TransportKind::HexSerial => Box::new(HexSerialTransport::new(
            settings.serial.port.as_str(),
            settings.serial.baudrate,
            settle_delay,
            io_timeout,
        )?),
        TransportKind::Gpio => Box::new(GpioTransport::new(
            settings.gpio.pins.as_slice(),
            settings.relay.active_low,
        )?),
        TransportKind::Dummy => Box::new(DummyTransport::new()),
    };
    info!(
        LOG_TAG,
        "mounted {:?} transport with {} channels", kind, count
    );

    let mut transports: HashMap<TransportKind, Box<dyn Transport + Send + Sync>> = HashMap::new();
    transports.insert(kind, transport);

    RelayBank::new(
        channels,
        transports,
        Duration::from_millis(settings.timing.inter_channel_ms),
    )
}

pub fn make_rule(settings: &Settings) -> Result<ScheduleRule, DriverError> {
    match settings.schedule.mode.as_str() {
        "fixed" => {
            // a transition only fires if a poll lands inside its minute,
            // so the poll interval must never skip a whole minute
            let poll = settings.schedule.poll_interval_secs;
            if poll == 0 || poll > 60 {
                return Err(DriverError::ConfigInvalid(format!(
                    "schedule.poll_interval_secs is {}, fixed mode needs 1..=60",
                    poll
                )));
            }
            Ok(ScheduleRule::FixedDaily {
                on_at: parse_clock_time(settings.schedule.on_at.as_str())?,
                off_at: parse_clock_time(settings.schedule.off_at.as_str())?,
            })
        }
        "cyclic" => Ok(ScheduleRule::Cyclic {
            on_hold: Duration::from_secs(settings.schedule.on_hold_secs),
            off_hold: Duration::from_secs(settings.schedule.off_hold_secs),
        }),
        other => Err(DriverError::ConfigInvalid(format!(
            "unknown schedule mode: {}",
            other
        ))),
    }
}

pub fn make_curfew(settings: &Settings) -> Result<NaiveTime, DriverError> {
    parse_clock_time(settings.window.curfew.as_str())
}
