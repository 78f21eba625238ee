// ── Account lifecycle ──
//
// Explicit setup/unload hooks for one configured account: authenticate,
// prime the coordinator, start polling, and build the entity platforms.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use utec_api::{Credentials, UhomeClient};

use crate::config::AccountConfig;
use crate::coordinator::Coordinator;
use crate::entity::{BatterySensor, LockEntity, battery_platform, lock_platform};
use crate::error::CoreError;
use crate::source::{DeviceSource, LockControl};

/// Why account settings were rejected by [`Account::validate`].
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid credentials: {0}")]
    InvalidAuth(String),

    #[error("Cannot connect: {0}")]
    CannotConnect(String),
}

/// A running account: client, coordinator and entities.
pub struct Account {
    client: Arc<UhomeClient>,
    coordinator: Coordinator,
    locks: Vec<LockEntity>,
    batteries: Vec<BatterySensor>,
}

impl Account {
    /// Authenticate, run the first refresh, start polling and build entities.
    ///
    /// Fails without spawning anything if authentication or the first
    /// refresh fails.
    pub async fn setup(config: &AccountConfig) -> Result<Self, CoreError> {
        Self::setup_with(config, config.credentials()).await
    }

    /// [`setup`](Self::setup) over caller-owned credentials.
    ///
    /// Tokens rotated during authentication stay reachable through
    /// `credentials` even when setup fails afterwards.
    pub async fn setup_with(
        config: &AccountConfig,
        credentials: Arc<Credentials>,
    ) -> Result<Self, CoreError> {
        let client = Arc::new(config.build_client_with(credentials)?);
        client.authenticate().await?;
        debug!(client_id = %config.client_id, "authenticated");

        let source: Arc<dyn DeviceSource> = client.clone();
        let coordinator = Coordinator::new(source, config.scan_interval);
        coordinator.first_refresh().await?;
        coordinator.start().await;

        let control: Arc<dyn LockControl> = client.clone();
        let locks = lock_platform(&coordinator, &control);
        let batteries = battery_platform(&coordinator);

        info!(
            locks = locks.len(),
            batteries = batteries.len(),
            "account set up"
        );

        Ok(Self {
            client,
            coordinator,
            locks,
            batteries,
        })
    }

    /// Stop polling and release the account.
    pub async fn unload(self) {
        self.coordinator.shutdown().await;
        info!("account unloaded");
    }

    /// Check that `config` can authenticate and list devices.
    ///
    /// Returns the number of devices on the account.
    pub async fn validate(config: &AccountConfig) -> Result<usize, ValidationError> {
        let client = config
            .build_client()
            .map_err(|e| ValidationError::CannotConnect(e.to_string()))?;

        client.authenticate().await.map_err(classify)?;
        let devices = client.try_list_devices().await.map_err(classify)?;

        if devices.is_empty() {
            warn!("no devices found on this account");
        }
        Ok(devices.len())
    }

    /// Shared token state, for persisting rotated tokens.
    pub fn credentials(&self) -> &Arc<Credentials> {
        self.client.credentials()
    }

    pub fn client(&self) -> &Arc<UhomeClient> {
        &self.client
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn locks(&self) -> &[LockEntity] {
        &self.locks
    }

    pub fn batteries(&self) -> &[BatterySensor] {
        &self.batteries
    }

    /// The lock entity for `device_id`.
    pub fn lock_entity(&self, device_id: &str) -> Result<&LockEntity, CoreError> {
        use crate::entity::Entity;

        self.locks
            .iter()
            .find(|l| l.device_id() == device_id)
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: device_id.to_owned(),
            })
    }
}

fn classify(err: utec_api::Error) -> ValidationError {
    if err.is_auth_error() {
        ValidationError::InvalidAuth(err.to_string())
    } else {
        ValidationError::CannotConnect(err.to_string())
    }
}
