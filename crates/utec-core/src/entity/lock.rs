use std::sync::Arc;

use tracing::{debug, warn};
use utec_api::LockCommand;

use super::{DOMAIN, DeviceInfo, Entity};
use crate::coordinator::Coordinator;
use crate::error::CoreError;
use crate::model::{Device, LockState};
use crate::source::LockControl;

/// A lock device, rendered from the coordinator's snapshot.
///
/// `lock`/`unlock` forward to the cloud and, when accepted, force a
/// coordinator refresh. The resulting state is whatever the next snapshot
/// reports; it is never assumed.
#[derive(Clone)]
pub struct LockEntity {
    device_id: String,
    unique_id: String,
    coordinator: Coordinator,
    control: Arc<dyn LockControl>,
}

impl LockEntity {
    pub fn new(coordinator: Coordinator, control: Arc<dyn LockControl>, device_id: &str) -> Self {
        Self {
            device_id: device_id.to_owned(),
            unique_id: format!("{DOMAIN}_{device_id}"),
            coordinator,
            control,
        }
    }

    fn with_device<R>(&self, f: impl FnOnce(&Device) -> Option<R>) -> Option<R> {
        self.coordinator.snapshot().device(&self.device_id).and_then(f)
    }

    /// `Some(true)` locked, `Some(false)` unlocked, `None` absent or unknown.
    pub fn is_locked(&self) -> Option<bool> {
        self.with_device(|d| d.status.lock_state.is_locked())
    }

    pub fn is_jammed(&self) -> bool {
        self.with_device(|d| Some(d.status.lock_state == LockState::Jammed))
            .unwrap_or(false)
    }

    /// Who last operated the lock, as reported by the cloud.
    pub fn changed_by(&self) -> Option<String> {
        self.with_device(|d| d.status.last_operated_by.clone())
    }

    pub async fn lock(&self) -> Result<(), CoreError> {
        self.command(LockCommand::Lock).await
    }

    pub async fn unlock(&self) -> Result<(), CoreError> {
        self.command(LockCommand::Unlock).await
    }

    async fn command(&self, command: LockCommand) -> Result<(), CoreError> {
        let accepted = match command {
            LockCommand::Lock => self.control.lock(&self.device_id).await,
            LockCommand::Unlock => self.control.unlock(&self.device_id).await,
        };

        if !accepted {
            return Err(CoreError::CommandFailed {
                command: command.as_str().to_owned(),
                device_id: self.device_id.clone(),
            });
        }

        debug!(device_id = %self.device_id, command = command.as_str(), "command accepted, refreshing");
        if let Err(e) = self.coordinator.refresh().await {
            warn!(device_id = %self.device_id, error = %e, "refresh after command failed");
        }
        Ok(())
    }
}

impl Entity for LockEntity {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn name(&self) -> String {
        self.with_device(|d| Some(d.display_name()))
            .unwrap_or_else(|| format!("Utec Lock {}", self.device_id))
    }

    fn available(&self) -> bool {
        self.with_device(|d| Some(d.is_online())).unwrap_or(false)
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        self.with_device(|d| Some(DeviceInfo::for_device(d)))
    }
}
