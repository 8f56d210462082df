mod common;
mod entity;
mod driver;
mod controller;
mod schedule;

use std::error::Error;
use std::time::Duration;

use chrono::Local;
use dotenv::dotenv;
use tokio_util::sync::CancellationToken;

use common::logger::init_logger;
use common::setting::Settings;
use controller::factory;
use schedule::clock::SystemClock;
use schedule::engine::ScheduleEngine;
use schedule::print_window;

const LOG_TAG: &str = "main.rs | engine entry";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // check env file
    dotenv().ok();

    // load config
    let settings = Settings::get();

    // set up logger
    init_logger()?;
    info!(LOG_TAG, "settings loaded, env: {}", settings.env.env);
    debug!(LOG_TAG, "settings: {:?}", settings);

    let bank = factory::make_bank(settings)?;
    let rule = factory::make_rule(settings)?;
    let curfew = factory::make_curfew(settings)?;
    let poll_interval = Duration::from_secs(settings.schedule.poll_interval_secs);

    info!(
        LOG_TAG,
        "{} started, scenario: {}",
        settings.meta.application_name,
        settings.meta.scenario_name
    );
    info!(
        LOG_TAG,
        "transport: {}, channels: {}",
        settings.relay.transport,
        settings.relay.channel_count
    );
    info!(
        LOG_TAG,
        "schedule mode: {}, poll interval: {}s",
        settings.schedule.mode,
        settings.schedule.poll_interval_secs
    );

    let window = print_window::evaluate(Local::now().naive_local(), curfew, 0);
    if window.minutes_until_curfew >= 0 {
        info!(
            LOG_TAG,
            "curfew at {}, {} minutes left today", curfew, window.minutes_until_curfew
        );
    } else {
        info!(LOG_TAG, "curfew at {} already passed today", curfew);
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(LOG_TAG, "stop signal received");
            signal_cancel.cancel();
        }
    });

    let mut engine = ScheduleEngine::new(bank, rule, poll_interval, SystemClock, cancel);
    engine.run().await?;
    info!(LOG_TAG, "engine stopped");

    Ok(())
}
