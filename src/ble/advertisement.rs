use std::collections::HashMap;

use macaddr::MacAddr6;
use uuid::Uuid;

/// One broadcast event received from a nearby BLE device. Lives only for the
/// duration of a single scan callback.
#[derive(Debug, Clone)]
pub struct Advertisement {
    pub address: MacAddr6,

    pub local_name: Option<String>,

    pub manufacturer_data: HashMap<u16, Vec<u8>>,

    pub service_data: HashMap<Uuid, Vec<u8>>,

    pub rssi: Option<i16>,

    pub tx_power: Option<i16>,
}
