// Device registry reads
//
// `Uhome.Device/List` + `Uhome.Device/Status`, merged into an ordered map.
// Also the capability-based `Uhome.Device/Query` read.

use indexmap::IndexMap;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::UhomeClient;
use crate::envelope::Action;
use crate::error::Error;
use crate::models::{DeviceRecord, QueriedDevice, StatusMap};

impl UhomeClient {
    /// List devices on the account.
    ///
    /// Failures are logged and yield an empty list.
    pub async fn list_devices(&self) -> Vec<DeviceRecord> {
        match self.try_list_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(error = %e, "failed to list devices");
                Vec::new()
            }
        }
    }

    /// List devices, propagating failures.
    ///
    /// Entries without an id are skipped.
    pub async fn try_list_devices(&self) -> Result<Vec<DeviceRecord>, Error> {
        debug!("listing devices");
        let payload = self.request(Action::DEVICE_LIST, json!({})).await?;

        let entries = payload
            .get("devices")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let devices: Vec<_> = entries.iter().filter_map(DeviceRecord::from_value).collect();
        if devices.len() < entries.len() {
            debug!(
                skipped = entries.len() - devices.len(),
                "skipped device entries without an id"
            );
        }
        Ok(devices)
    }

    /// Status object for one device. Failures are logged and yield `{}`.
    pub async fn get_status(&self, device_id: &str) -> StatusMap {
        match self.try_get_status(device_id).await {
            Ok(status) => status,
            Err(e) => {
                warn!(device_id, error = %e, "failed to fetch device status");
                StatusMap::new()
            }
        }
    }

    /// Status object for one device, propagating failures.
    pub async fn try_get_status(&self, device_id: &str) -> Result<StatusMap, Error> {
        debug!(device_id, "fetching device status");
        let payload = self
            .request(Action::DEVICE_STATUS, json!({ "device_id": device_id }))
            .await?;

        Ok(match payload {
            Value::Object(map) => map,
            _ => StatusMap::new(),
        })
    }

    /// Device list merged with each device's status, keyed by id in list order.
    ///
    /// Status fetches run one after another. A failed status fetch leaves
    /// that device with an empty status; a failed list fetch is returned
    /// as an error.
    pub async fn get_devices_with_status(&self) -> Result<IndexMap<String, DeviceRecord>, Error> {
        let devices = self.try_list_devices().await?;
        let mut merged = IndexMap::with_capacity(devices.len());

        for mut device in devices {
            device.status = self.get_status(&device.id).await;
            merged.insert(device.id.clone(), device);
        }

        debug!(count = merged.len(), "fetched devices with status");
        Ok(merged)
    }

    /// Capability states for the given devices via `Uhome.Device/Query`.
    pub async fn query_devices(&self, device_ids: &[&str]) -> Result<Vec<QueriedDevice>, Error> {
        let devices: Vec<Value> = device_ids.iter().map(|id| json!({ "id": id })).collect();
        let payload = self
            .request(Action::DEVICE_QUERY, json!({ "devices": devices }))
            .await?;

        let Some(entries) = payload.get("devices").cloned() else {
            return Ok(Vec::new());
        };
        serde_json::from_value(entries).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: payload.to_string(),
        })
    }
}
