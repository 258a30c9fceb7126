use std::time::Duration;

use anyhow::{Context as _, Result};
use futures::Stream;
use indexmap::IndexMap;
use log::{debug, info, trace};
use macaddr::MacAddr6;
use tokio_stream::StreamExt as _;

use crate::atc;
use crate::ble::Advertisement;

/// Scanning backend. `start` powers up the scanner and hands back the
/// advertisement event stream; the stream must not be held open across scans.
#[allow(async_fn_in_trait)]
pub trait ScanRadio {
    type Events: Stream<Item = Advertisement> + Unpin;

    async fn start(&mut self, active: bool) -> Result<Self::Events>;

    async fn stop(&mut self) -> Result<()>;

    async fn clear_results(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SensorReading {
    pub valid: bool,

    pub temperature_celsius: f32,

    pub humidity_percent: f32,

    pub battery_percent: u8,

    pub rssi: i16,
}

/// BLE thermometer/hygrometer client: correlates advertisements against the
/// set of known sensor addresses and keeps the latest decoded reading per
/// sensor.
#[derive(Debug)]
pub struct BleSensors {
    sensors: IndexMap<MacAddr6, SensorReading>,
}

// Distinct-match bookkeeping for one scan invocation.
struct ScanSession {
    matched: Vec<bool>,
    devices_found: usize,
}

impl ScanSession {
    fn new(sensor_count: usize) -> Self {
        Self {
            matched: vec![false; sensor_count],
            devices_found: 0,
        }
    }

    fn record_match(&mut self, index: usize) {
        if !self.matched[index] {
            self.matched[index] = true;
            self.devices_found += 1;
        }
    }

    fn all_found(&self) -> bool {
        self.devices_found == self.matched.len()
    }
}

impl BleSensors {
    pub fn new(known_sensors: impl IntoIterator<Item = MacAddr6>) -> Self {
        let sensors = known_sensors
            .into_iter()
            .map(|address| (address, SensorReading::default()))
            .collect();

        Self { sensors }
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn readings(&self) -> &IndexMap<MacAddr6, SensorReading> {
        &self.sensors
    }

    pub fn get(&self, address: &MacAddr6) -> Option<&SensorReading> {
        self.sensors.get(address)
    }

    /// Marks every reading invalid. Field contents are unspecified until the
    /// next successful decode overwrites them.
    pub fn reset_data(&mut self) {
        for reading in self.sensors.values_mut() {
            reading.valid = false;
        }
    }

    /// Scans for up to `duration` and decodes advertisements from known
    /// sensors. Aborts the scan as soon as every known sensor has reported
    /// at least once. Returns the number of distinct sensors that reported.
    pub async fn get_data<R: ScanRadio>(
        &mut self,
        radio: &mut R,
        duration: Duration,
    ) -> Result<usize> {
        let mut events = radio.start(true).await.context("failed to start BLE scan")?;
        let mut session = ScanSession::new(self.sensors.len());

        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            if session.all_found() {
                info!("all {} known sensors reported, stopping scan", self.sensors.len());
                break;
            }

            tokio::select! {
                _ = &mut deadline => {
                    debug!("scan budget elapsed");
                    break;
                }
                event = events.next() => {
                    let Some(advertisement) = event else {
                        debug!("advertisement stream ended");
                        break;
                    };
                    self.handle_advertisement(&mut session, &advertisement);
                }
            }
        }

        drop(events);
        radio.stop().await.context("failed to stop BLE scan")?;

        Ok(session.devices_found)
    }

    /// Releases advertisement buffering retained by the scanning backend.
    /// Does not touch the readings.
    pub async fn clear_results<R: ScanRadio>(&self, radio: &mut R) -> Result<()> {
        radio
            .clear_results()
            .await
            .context("failed to clear scan results")
    }

    fn handle_advertisement(&mut self, session: &mut ScanSession, advertisement: &Advertisement) {
        trace!("advertisement from {}", advertisement.address);

        let Some(index) = self.sensors.get_index_of(&advertisement.address) else {
            return;
        };

        let decoded = match atc::decode_ble_data(
            &advertisement.manufacturer_data,
            &advertisement.service_data,
        ) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(
                    "failed to decode advertisement from {}: {err:#}",
                    advertisement.address
                );
                return;
            }
        };

        let reading = &mut self.sensors[index];
        reading.temperature_celsius = decoded.temperature_celsius;
        reading.humidity_percent = decoded.humidity_percent;
        reading.battery_percent = decoded.battery_percent;
        reading.rssi = advertisement.rssi.unwrap_or_default();
        // A report with an empty battery gauge is not trusted this cycle.
        reading.valid = decoded.battery_percent > 0;

        session.record_match(index);

        info!(
            "{}: {:.1} degC, {:.1} %, battery {} %, rssi {} dBm",
            advertisement.address,
            reading.temperature_celsius,
            reading.humidity_percent,
            reading.battery_percent,
            reading.rssi
        );
    }
}
