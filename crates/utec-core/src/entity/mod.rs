// ── Entity adapters ──
//
// Read-mostly projections of the coordinator's snapshot. Entities hold
// no device state of their own; every accessor reads the latest snapshot.

mod battery;
mod lock;

use std::sync::Arc;

use serde::Serialize;

use crate::coordinator::Coordinator;
use crate::model::Device;
use crate::source::LockControl;

pub use battery::BatterySensor;
pub use lock::LockEntity;

/// Identifier namespace for every entity this crate produces.
pub const DOMAIN: &str = "utec_lock";
pub const MANUFACTURER: &str = "U-tec";
pub const DEFAULT_MODEL: &str = "Ultraloq";
pub const DEFAULT_SW_VERSION: &str = "Unknown";

/// Physical-device metadata shared by all entities of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub identifiers: Vec<(String, String)>,
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub sw_version: String,
}

impl DeviceInfo {
    pub fn for_device(device: &Device) -> Self {
        Self {
            identifiers: vec![(DOMAIN.to_owned(), device.id.clone())],
            name: device.display_name(),
            manufacturer: MANUFACTURER.to_owned(),
            model: device
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            sw_version: device
                .firmware_version
                .clone()
                .unwrap_or_else(|| DEFAULT_SW_VERSION.to_owned()),
        }
    }
}

/// Common surface of lock and sensor entities.
pub trait Entity {
    fn unique_id(&self) -> &str;
    fn device_id(&self) -> &str;
    fn name(&self) -> String;
    fn available(&self) -> bool;
    fn device_info(&self) -> Option<DeviceInfo>;
}

/// Lock entities for every `lock` device in the coordinator's snapshot.
pub fn lock_platform(coordinator: &Coordinator, control: &Arc<dyn LockControl>) -> Vec<LockEntity> {
    coordinator
        .snapshot()
        .locks()
        .map(|device| LockEntity::new(coordinator.clone(), Arc::clone(control), &device.id))
        .collect()
}

/// Battery sensors for every lock and every device reporting a level.
pub fn battery_platform(coordinator: &Coordinator) -> Vec<BatterySensor> {
    coordinator
        .snapshot()
        .devices
        .values()
        .filter(|d| d.is_lock() || d.status.battery.is_some())
        .map(|device| BatterySensor::new(coordinator.clone(), &device.id))
        .collect()
}
