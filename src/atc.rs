use std::collections::HashMap;

use anyhow::{Context as _, Result, anyhow, bail};
use uuid::{Uuid, uuid};

#[derive(Debug, Clone, Copy)]
pub struct DecodedReading {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub battery_percent: u8,
    pub battery_millivolts: u16,
}

// Ref: https://github.com/pvvx/ATC_MiThermometer#advertising-format-of-the-custom-firmware
const ENVIRONMENTAL_SENSING_SERVICE_DATA_UUID: Uuid =
    uuid!("0000181a-0000-1000-8000-00805f9b34fb");

const ATC1441_SERVICE_DATA_LEN: usize = 13;
const PVVX_CUSTOM_SERVICE_DATA_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingFormat {
    Atc1441,
    PvvxCustom,
}

pub fn decode_ble_data(
    _manufacturer_data: &HashMap<u16, Vec<u8>>,
    service_data: &HashMap<Uuid, Vec<u8>>,
) -> Result<DecodedReading> {
    let atc_service_data =
        get_atc_service_data(service_data).context("failed to get ATC service data")?;

    let format = detect_advertising_format(atc_service_data)
        .context("failed to detect ATC advertising format")?;

    decode_service_data(&format, atc_service_data).context("failed to decode ATC service data")
}

pub fn decode_service_data(
    format: &AdvertisingFormat,
    service_data: &[u8],
) -> Result<DecodedReading> {
    match format {
        AdvertisingFormat::Atc1441 => decode_atc1441_service_data(service_data),
        AdvertisingFormat::PvvxCustom => decode_pvvx_custom_service_data(service_data),
    }
}

// atc1441 layout: MAC[0..6], temperature[6..8] (BE, 0.1 degC), humidity[8] (%),
// battery[9] (%), battery[10..12] (BE, mV), frame counter[12]
pub fn decode_atc1441_service_data(service_data: &[u8]) -> Result<DecodedReading> {
    if service_data.len() < ATC1441_SERVICE_DATA_LEN {
        bail!(
            "atc1441 service data too short: expected at least {} bytes, got {}",
            ATC1441_SERVICE_DATA_LEN,
            service_data.len()
        )
    }

    let temperature_celsius = i16::from_be_bytes([service_data[6], service_data[7]]) as f32 / 10f32;
    let humidity_percent =
        decode_humidity_percent(service_data[8] as f32).context("failed to decode humidity")?;
    let battery_percent =
        decode_battery_percent(service_data[9]).context("failed to decode battery level")?;
    let battery_millivolts = u16::from_be_bytes([service_data[10], service_data[11]]);

    Ok(DecodedReading {
        temperature_celsius,
        humidity_percent,
        battery_percent,
        battery_millivolts,
    })
}

// pvvx custom layout: MAC[0..6], temperature[6..8] (LE, 0.01 degC),
// humidity[8..10] (LE, 0.01 %), battery[10..12] (LE, mV), battery[12] (%),
// counter[13], flags[14]
pub fn decode_pvvx_custom_service_data(service_data: &[u8]) -> Result<DecodedReading> {
    if service_data.len() < PVVX_CUSTOM_SERVICE_DATA_LEN {
        bail!(
            "pvvx custom service data too short: expected at least {} bytes, got {}",
            PVVX_CUSTOM_SERVICE_DATA_LEN,
            service_data.len()
        )
    }

    let temperature_celsius =
        i16::from_le_bytes([service_data[6], service_data[7]]) as f32 / 100f32;
    let humidity_raw = u16::from_le_bytes([service_data[8], service_data[9]]) as f32 / 100f32;
    let humidity_percent =
        decode_humidity_percent(humidity_raw).context("failed to decode humidity")?;
    let battery_millivolts = u16::from_le_bytes([service_data[10], service_data[11]]);
    let battery_percent =
        decode_battery_percent(service_data[12]).context("failed to decode battery level")?;

    Ok(DecodedReading {
        temperature_celsius,
        humidity_percent,
        battery_percent,
        battery_millivolts,
    })
}

fn get_atc_service_data(service_data: &HashMap<Uuid, Vec<u8>>) -> Result<&[u8]> {
    Ok(service_data
        .get(&ENVIRONMENTAL_SENSING_SERVICE_DATA_UUID)
        .ok_or_else(|| {
            anyhow!("ATC service data not found: {ENVIRONMENTAL_SENSING_SERVICE_DATA_UUID}")
        })?)
}

fn detect_advertising_format(service_data: &[u8]) -> Result<AdvertisingFormat> {
    match service_data.len() {
        ATC1441_SERVICE_DATA_LEN => Ok(AdvertisingFormat::Atc1441),
        PVVX_CUSTOM_SERVICE_DATA_LEN => Ok(AdvertisingFormat::PvvxCustom),
        n => bail!("unexpected ATC service data length: {n}"),
    }
}

fn decode_humidity_percent(v: f32) -> Result<f32> {
    if !(0.0..=100.0).contains(&v) {
        bail!("humidity out of range: expected 0-100, got {v}");
    }

    Ok(v)
}

fn decode_battery_percent(v: u8) -> Result<u8> {
    if v > 100 {
        bail!("battery level out of range: expected 0-100, got {v}");
    }

    Ok(v)
}
