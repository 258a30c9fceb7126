use std::pin::Pin;

use anyhow::{Context as _, Result, anyhow};
use btleplug::{
    api::{Central as _, CentralEvent, Manager as _, Peripheral as _, ScanFilter},
    platform::{Adapter, Manager},
};
use futures::{Stream, StreamExt as _};
use weather_node::ble::{Advertisement, ScanRadio};

pub struct BtleplugRadio {
    adapter: Adapter,
}

impl BtleplugRadio {
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .context("failed to initialize Bluetooth manager")?;

        let adapters = manager
            .adapters()
            .await
            .context("failed to get Bluetooth adapters")?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no Bluetooth adapters found"))?;

        Ok(Self { adapter })
    }
}

impl ScanRadio for BtleplugRadio {
    type Events = Pin<Box<dyn Stream<Item = Advertisement> + Send>>;

    async fn start(&mut self, active: bool) -> Result<Self::Events> {
        // btleplug exposes no passive-scan toggle; advertisement events come
        // from the equivalent of an active scan either way
        let _ = active;

        let events = self
            .adapter
            .events()
            .await
            .context("failed to get adapter event stream")?;

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .context("failed to start BLE scan")?;

        let adapter = self.adapter.clone();
        Ok(Box::pin(events.filter_map(move |event| {
            let adapter = adapter.clone();
            async move { advertisement_from_event(&adapter, event).await }
        })))
    }

    async fn stop(&mut self) -> Result<()> {
        self.adapter
            .stop_scan()
            .await
            .context("failed to stop BLE scan")
    }

    async fn clear_results(&mut self) -> Result<()> {
        // btleplug buffers nothing once the event stream is dropped
        Ok(())
    }
}

async fn advertisement_from_event(adapter: &Adapter, event: CentralEvent) -> Option<Advertisement> {
    let id = match event {
        CentralEvent::DeviceDiscovered(id)
        | CentralEvent::DeviceUpdated(id)
        | CentralEvent::ManufacturerDataAdvertisement { id, .. }
        | CentralEvent::ServiceDataAdvertisement { id, .. } => id,
        _ => return None,
    };

    let peripheral = adapter.peripheral(&id).await.ok()?;
    let address = peripheral.address().into_inner().into();
    let properties = peripheral.properties().await.ok()??;

    Some(Advertisement {
        address,
        local_name: properties.local_name,
        manufacturer_data: properties.manufacturer_data,
        service_data: properties.service_data,
        rssi: properties.rssi,
        tx_power: properties.tx_power_level,
    })
}
