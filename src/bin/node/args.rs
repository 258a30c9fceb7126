use std::time::Duration;

use clap::Parser;
use macaddr::MacAddr6;
use weather_node::power::PowerConfig;

#[derive(Debug, Parser)]
pub struct Args {
    /// Known sensor addresses, e.g. a4:c1:38:b8:1f:7f (repeatable)
    #[arg(long = "sensor", required = true)]
    pub sensors: Vec<MacAddr6>,

    #[arg(long, default_value_t = 31)]
    pub scan_time_secs: u64,

    /// Measured supply voltage; sampling is board-specific and external
    #[arg(long, env = "BATTERY_MILLIVOLTS", default_value_t = 4050)]
    pub battery_millivolts: u16,

    #[arg(long, default_value_t = 3500)]
    pub battery_weak_millivolts: u16,

    #[arg(long, default_value_t = 3200)]
    pub battery_low_millivolts: u16,

    #[arg(long, default_value_t = 360)]
    pub sleep_interval_secs: u64,

    #[arg(long, default_value_t = 900)]
    pub sleep_interval_long_secs: u64,

    #[arg(long, default_value_t = 1800)]
    pub sleep_timeout_initial_secs: u64,

    #[arg(long, default_value_t = 600)]
    pub sleep_timeout_secs: u64,

    #[arg(long, default_value_t = 300)]
    pub sleep_timeout_extra_secs: u64,
}

impl Args {
    pub fn scan_time(&self) -> Duration {
        Duration::from_secs(self.scan_time_secs)
    }

    pub fn power_config(&self) -> PowerConfig {
        PowerConfig {
            battery_weak_millivolts: self.battery_weak_millivolts,
            battery_low_millivolts: self.battery_low_millivolts,
            sleep_interval: Duration::from_secs(self.sleep_interval_secs),
            sleep_interval_long: Duration::from_secs(self.sleep_interval_long_secs),
            sleep_timeout_initial: Duration::from_secs(self.sleep_timeout_initial_secs),
            sleep_timeout: Duration::from_secs(self.sleep_timeout_secs),
            sleep_timeout_extra: Duration::from_secs(self.sleep_timeout_extra_secs),
        }
    }
}
