// ── Backend seams ──
//
// The coordinator and entities talk to the cloud through these traits so
// tests can substitute in-memory fakes. `UhomeClient` implements both.

use async_trait::async_trait;
use indexmap::IndexMap;

use utec_api::{DeviceRecord, UhomeClient};

/// Source of merged device + status records for one poll cycle.
#[async_trait]
pub trait DeviceSource: Send + Sync {
    async fn fetch_devices(&self) -> Result<IndexMap<String, DeviceRecord>, utec_api::Error>;
}

/// Lock command sink. `true` means the server accepted the command.
#[async_trait]
pub trait LockControl: Send + Sync {
    async fn lock(&self, device_id: &str) -> bool;
    async fn unlock(&self, device_id: &str) -> bool;
}

#[async_trait]
impl DeviceSource for UhomeClient {
    async fn fetch_devices(&self) -> Result<IndexMap<String, DeviceRecord>, utec_api::Error> {
        self.get_devices_with_status().await
    }
}

#[async_trait]
impl LockControl for UhomeClient {
    async fn lock(&self, device_id: &str) -> bool {
        UhomeClient::lock(self, device_id).await
    }

    async fn unlock(&self, device_id: &str) -> bool {
        UhomeClient::unlock(self, device_id).await
    }
}
