//! setting config file
//! loads config_{ENV}.toml from the working directory, cached for the process lifetime

use std::{fs::File, io::Read};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub application_name: String,
    pub scenario_name: String,
}

#[derive(Debug, Deserialize)]
pub struct Env {
    pub debug: bool,
    pub env: String,
    pub log_level: String,
}

/// relay bank topology
#[derive(Debug, Deserialize)]
pub struct Relay {
    /// transport kind: mqtt | line_serial | hex_serial | gpio | dummy
    pub transport: String,
    pub channel_count: u8,
    /// polarity flag, only meaningful for the gpio transport
    pub active_low: bool,
}

#[derive(Debug, Deserialize)]
pub struct Mqtt {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    /// channel id is appended, e.g. "cmnd/sonoff/POWER" + "1"
    pub topic_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct Serial {
    pub port: String,
    pub baudrate: u32,
}

#[derive(Debug, Deserialize)]
pub struct Gpio {
    /// pin per channel, index 0 maps to channel 1
    pub pins: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct Schedule {
    /// schedule mode: fixed | cyclic
    pub mode: String,
    /// clock times "HH:MM", fixed mode only
    pub on_at: String,
    pub off_at: String,
    /// hold durations, cyclic mode only
    pub on_hold_secs: u64,
    pub off_hold_secs: u64,
    pub poll_interval_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Timing {
    pub settle_ms: u64,
    pub inter_channel_ms: u64,
    pub io_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct Window {
    /// daily curfew "HH:MM", no job may run past it
    pub curfew: String,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub meta: Meta,
    pub env: Env,
    pub relay: Relay,
    pub mqtt: Mqtt,
    pub serial: Serial,
    pub gpio: Gpio,
    pub schedule: Schedule,
    pub timing: Timing,
    pub window: Window,
}

impl Default for Settings {
    fn default() -> Self {
        let env = match env::var("ENV") {
            Ok(e) => e,
            Err(_) => {
                log::warn!("no ENV set, use default: 'dev'");
                String::from("dev")
            }
        };

        let file_path: String = format!("config_{}.toml", env);

        let mut file = match File::open(file_path.as_str()) {
            Ok(f) => f,
            Err(e) => panic!("no such file {} exception:{}", file_path.as_str(), e)
        };

        let mut str_val = String::new();

        match file.read_to_string(&mut str_val) {
            Ok(s) => s,
            Err(e) => panic!("cannot read config file: {}", e)
        };

        toml::from_str(&str_val).expect("config file format invalid")
    }
}

impl Settings {
    pub fn get<'a>() -> &'a Self {
        lazy_static! {
            static ref CACHE: Settings = Settings::default();
        }
        &CACHE
    }
}
