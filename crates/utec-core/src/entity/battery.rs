use super::{DOMAIN, DeviceInfo, Entity};
use crate::coordinator::Coordinator;

pub const DEVICE_CLASS: &str = "battery";
pub const UNIT: &str = "%";

/// Battery level of a device, in percent.
#[derive(Clone)]
pub struct BatterySensor {
    device_id: String,
    unique_id: String,
    coordinator: Coordinator,
}

impl BatterySensor {
    pub fn new(coordinator: Coordinator, device_id: &str) -> Self {
        Self {
            device_id: device_id.to_owned(),
            unique_id: format!("{DOMAIN}_{device_id}_battery"),
            coordinator,
        }
    }

    pub fn device_class(&self) -> &'static str {
        DEVICE_CLASS
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        UNIT
    }

    /// Battery percentage, `None` when absent or unknown.
    pub fn native_value(&self) -> Option<u8> {
        self.coordinator
            .snapshot()
            .device(&self.device_id)
            .and_then(|d| d.status.battery)
    }
}

impl Entity for BatterySensor {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn name(&self) -> String {
        let device_name = self
            .coordinator
            .snapshot()
            .device(&self.device_id)
            .map_or_else(|| format!("Utec Lock {}", self.device_id), |d| d.display_name());
        format!("{device_name} Battery")
    }

    fn available(&self) -> bool {
        self.coordinator
            .snapshot()
            .device(&self.device_id)
            .is_some_and(|d| d.is_online())
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        self.coordinator
            .snapshot()
            .device(&self.device_id)
            .map(DeviceInfo::for_device)
    }
}
