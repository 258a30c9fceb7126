use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatteryState {
    Ok,
    /// Weak battery: stretch the sleep interval to save energy.
    Weak,
    /// Low battery: skip the wake cycle's work entirely to prevent deep
    /// discharge.
    Low,
}

/// Power-saving policy values. Supplied by the orchestrator at startup, never
/// compiled in.
#[derive(Debug, Clone)]
pub struct PowerConfig {
    pub battery_weak_millivolts: u16,

    pub battery_low_millivolts: u16,

    pub sleep_interval: Duration,

    pub sleep_interval_long: Duration,

    /// Wake-time bound for the very first cycle after power-up.
    pub sleep_timeout_initial: Duration,

    /// Wake-time bound for every later cycle.
    pub sleep_timeout: Duration,

    /// Additional allowance while a clock sync is still outstanding.
    pub sleep_timeout_extra: Duration,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            battery_weak_millivolts: 3500,
            battery_low_millivolts: 3200,
            sleep_interval: Duration::from_secs(360),
            sleep_interval_long: Duration::from_secs(900),
            sleep_timeout_initial: Duration::from_secs(1800),
            sleep_timeout: Duration::from_secs(600),
            sleep_timeout_extra: Duration::from_secs(300),
        }
    }
}

impl PowerConfig {
    pub fn battery_state(&self, battery_millivolts: u16) -> BatteryState {
        if battery_millivolts <= self.battery_low_millivolts {
            BatteryState::Low
        } else if battery_millivolts <= self.battery_weak_millivolts {
            BatteryState::Weak
        } else {
            BatteryState::Ok
        }
    }

    /// Sleep duration tier for the measured supply voltage.
    pub fn sleep_duration(&self, battery_millivolts: u16) -> Duration {
        match self.battery_state(battery_millivolts) {
            BatteryState::Ok => self.sleep_interval,
            BatteryState::Weak | BatteryState::Low => self.sleep_interval_long,
        }
    }

    /// Upper bound on one wake cycle, regardless of scan or uplink outcome.
    pub fn wake_timeout(&self, first_cycle: bool, time_sync_pending: bool) -> Duration {
        let base = if first_cycle {
            self.sleep_timeout_initial
        } else {
            self.sleep_timeout
        };

        if time_sync_pending {
            base + self.sleep_timeout_extra
        } else {
            base
        }
    }
}
