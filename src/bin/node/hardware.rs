use std::io::{self, Write as _};
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::{NaiveDateTime, Utc};
use log::debug;
use weather_node::rtc::SleepHardware;

/// Host stand-in for the board's RTC and deep-sleep block: reads the system
/// clock and parks the process until the programmed wake time.
pub struct HostSleep;

impl SleepHardware for HostSleep {
    fn read_clock(&mut self) -> Result<NaiveDateTime> {
        Ok(Utc::now().naive_utc())
    }

    fn quiesce(&mut self) -> Result<()> {
        io::stdout().flush().context("failed to flush stdout")
    }

    fn enter(&mut self, wake_at: NaiveDateTime) -> Result<()> {
        let now = Utc::now().naive_utc();
        let remaining = (wake_at - now).to_std().unwrap_or(Duration::ZERO);

        debug!("suspended for {}s", remaining.as_secs());
        thread::sleep(remaining);

        Ok(())
    }
}
