use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::{DateTime, NaiveDateTime};
use log::info;

/// RTC and deep-sleep block of the board. `enter` programs the wake alarm,
/// performs the sleep transition and returns only once the hardware has
/// resumed with its clocks reinitialized. There is no way to cancel a sleep
/// in progress.
pub trait SleepHardware {
    fn read_clock(&mut self) -> Result<NaiveDateTime>;

    /// Flushes and shuts down host communication interfaces.
    fn quiesce(&mut self) -> Result<()>;

    fn enter(&mut self, wake_at: NaiveDateTime) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct SleepPlan {
    pub wake_at: NaiveDateTime,

    pub requested: Duration,
}

impl SleepPlan {
    pub fn new(now: NaiveDateTime, requested: Duration) -> Result<Self> {
        let wake_at = wake_time(now, requested).context("failed to compute wake time")?;

        Ok(Self { wake_at, requested })
    }
}

/// Adds `duration` to a calendar time by round-tripping through epoch
/// seconds. chrono normalizes all field rollovers on the way back, leap days
/// included.
pub fn wake_time(now: NaiveDateTime, duration: Duration) -> Result<NaiveDateTime> {
    let duration_secs =
        i64::try_from(duration.as_secs()).context("sleep duration out of range")?;

    let wake_epoch = now
        .and_utc()
        .timestamp()
        .checked_add(duration_secs)
        .context("wake time overflows epoch seconds")?;

    let wake_at = DateTime::from_timestamp(wake_epoch, 0)
        .context("wake time not representable as calendar time")?;

    Ok(wake_at.naive_utc())
}

/// Suspends until `now + duration`. The clock is read and the wake time
/// computed before any interface teardown, so teardown latency is not billed
/// against the sleep. Requires a previously set RTC; an unavailable clock is
/// a precondition violation and the error propagates to the caller.
pub fn suspend_for(hardware: &mut impl SleepHardware, duration: Duration) -> Result<SleepPlan> {
    let now = hardware.read_clock().context("failed to read RTC")?;
    let plan = SleepPlan::new(now, duration)?;

    info!("RTC time: {now}");
    info!("wakeup time: {} ({}s)", plan.wake_at, duration.as_secs());

    hardware
        .quiesce()
        .context("failed to quiesce interfaces before sleep")?;
    hardware
        .enter(plan.wake_at)
        .context("failed to enter deep sleep")?;

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    use anyhow::bail;
    use chrono::NaiveDate;

    fn calendar(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[derive(Default)]
    struct RecordingHardware {
        now: Option<NaiveDateTime>,
        calls: Vec<&'static str>,
        entered_at: Option<NaiveDateTime>,
    }

    impl SleepHardware for RecordingHardware {
        fn read_clock(&mut self) -> Result<NaiveDateTime> {
            self.calls.push("read_clock");
            match self.now {
                Some(now) => Ok(now),
                None => bail!("RTC not set"),
            }
        }

        fn quiesce(&mut self) -> Result<()> {
            self.calls.push("quiesce");
            Ok(())
        }

        fn enter(&mut self, wake_at: NaiveDateTime) -> Result<()> {
            self.calls.push("enter");
            self.entered_at = Some(wake_at);
            Ok(())
        }
    }

    #[test]
    fn test_wake_time_rolls_over_leap_day() {
        let now = calendar(2024, 2, 29, 23, 59, 50);
        let wake_at = wake_time(now, Duration::from_secs(20)).unwrap();
        assert_eq!(wake_at, calendar(2024, 3, 1, 0, 0, 10));
    }

    #[test]
    fn test_wake_time_rolls_over_year_boundary() {
        let now = calendar(2023, 12, 31, 23, 59, 55);
        let wake_at = wake_time(now, Duration::from_secs(10)).unwrap();
        assert_eq!(wake_at, calendar(2024, 1, 1, 0, 0, 5));
    }

    #[test]
    fn test_wake_time_skips_nonexistent_leap_day() {
        // 2023 is not a leap year
        let now = calendar(2023, 2, 28, 23, 59, 50);
        let wake_at = wake_time(now, Duration::from_secs(20)).unwrap();
        assert_eq!(wake_at, calendar(2023, 3, 1, 0, 0, 10));
    }

    #[test]
    fn test_wake_time_zero_duration() {
        let now = calendar(2024, 6, 1, 12, 0, 0);
        let wake_at = wake_time(now, Duration::ZERO).unwrap();
        assert_eq!(wake_at, now);
    }

    #[test]
    fn test_suspend_reads_clock_before_teardown() {
        let mut hardware = RecordingHardware {
            now: Some(calendar(2024, 2, 29, 23, 59, 50)),
            ..Default::default()
        };

        let plan = suspend_for(&mut hardware, Duration::from_secs(20)).unwrap();

        assert_eq!(hardware.calls, vec!["read_clock", "quiesce", "enter"]);
        assert_eq!(plan.wake_at, calendar(2024, 3, 1, 0, 0, 10));
        assert_eq!(hardware.entered_at, Some(plan.wake_at));
        assert_eq!(plan.requested, Duration::from_secs(20));
    }

    #[test]
    fn test_suspend_propagates_unset_rtc() {
        let mut hardware = RecordingHardware::default();

        let err = suspend_for(&mut hardware, Duration::from_secs(20)).unwrap_err();

        assert!(format!("{err:#}").contains("failed to read RTC"));
        // no teardown or sleep attempt on a dead clock
        assert_eq!(hardware.calls, vec!["read_clock"]);
    }
}
