mod args;
mod hardware;
mod radio;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result};
use args::Args;
use clap::Parser as _;
use log::{info, warn};
use weather_node::ble::BleSensors;
use weather_node::power::BatteryState;
use weather_node::rtc;

use crate::hardware::HostSleep;
use crate::radio::BtleplugRadio;

#[tokio::main]
async fn main() -> ExitCode {
    pretty_env_logger::init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let power = args.power_config();

    let mut radio = BtleplugRadio::new()
        .await
        .context("failed to initialize BLE radio")?;
    let mut hardware = HostSleep;
    let mut sensors = BleSensors::new(args.sensors.iter().copied());

    let mut first_cycle = true;

    loop {
        let cycle_start = Instant::now();
        let timeout = power.wake_timeout(first_cycle, false);
        first_cycle = false;

        let battery_millivolts = args.battery_millivolts;
        match power.battery_state(battery_millivolts) {
            BatteryState::Low => {
                warn!("battery low ({battery_millivolts} mV), skipping measurements");
            }
            BatteryState::Weak | BatteryState::Ok => {
                let budget = args
                    .scan_time()
                    .min(timeout.saturating_sub(cycle_start.elapsed()));
                measure(&mut sensors, &mut radio, budget).await?;
            }
        }

        if cycle_start.elapsed() >= timeout {
            warn!(
                "wake timeout reached after {}s, forcing sleep",
                cycle_start.elapsed().as_secs()
            );
        }

        let duration = power.sleep_duration(battery_millivolts);
        tokio::task::block_in_place(|| rtc::suspend_for(&mut hardware, duration))
            .context("failed to suspend")?;
    }
}

async fn measure(
    sensors: &mut BleSensors,
    radio: &mut BtleplugRadio,
    budget: Duration,
) -> Result<()> {
    sensors.reset_data();

    let found = sensors
        .get_data(radio, budget)
        .await
        .context("failed to scan for sensors")?;
    info!("{found}/{} known sensors reported", sensors.len());

    for (address, reading) in sensors.readings() {
        if reading.valid {
            println!(
                "{address}: {:.2} degC, {:.2} %, battery {} %, rssi {} dBm",
                reading.temperature_celsius,
                reading.humidity_percent,
                reading.battery_percent,
                reading.rssi
            );
        } else {
            println!("{address}: no data");
        }
    }

    sensors.clear_results(radio).await?;

    Ok(())
}
