// ── Device domain types ──
//
// Canonical representation of a U-tec device and the snapshot the poll
// coordinator publishes. Built from `utec_api::DeviceRecord` in convert.rs.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{AsRefStr, Display, EnumString};

/// Type tag the cloud uses for lock devices.
pub const LOCK_DEVICE_TYPE: &str = "lock";

/// Bolt position as last reported by the cloud.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Locked,
    Unlocked,
    Jammed,
    #[default]
    Unknown,
}

impl LockState {
    /// Parse a server string; anything unrecognised is `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Self::Unknown)
    }

    /// `Some(true)` when locked, `Some(false)` when unlocked, else `None`.
    pub fn is_locked(self) -> Option<bool> {
        match self {
            Self::Locked => Some(true),
            Self::Unlocked => Some(false),
            Self::Jammed | Self::Unknown => None,
        }
    }
}

/// Parsed device status. Every field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub online: Option<bool>,
    /// Battery percentage, 0..=100.
    pub battery: Option<u8>,
    pub lock_state: LockState,
    pub last_operated_by: Option<String>,
}

/// A device as seen in one poll cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: Option<String>,
    pub device_type: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub status: DeviceStatus,
    /// Status object exactly as the server sent it.
    pub raw_status: Map<String, Value>,
}

impl Device {
    pub fn is_lock(&self) -> bool {
        self.device_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(LOCK_DEVICE_TYPE))
    }

    /// Present and reporting online. Unknown counts as offline.
    pub fn is_online(&self) -> bool {
        self.status.online == Some(true)
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Utec Lock {}", self.id))
    }
}

/// Every device on the account at one point in time, in list order.
///
/// Replaced wholesale each poll; never mutated after publication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub devices: IndexMap<String, Device>,
    /// `None` until the first successful poll.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.get(id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn locks(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(|d| d.is_lock())
    }
}

/// Outcome of recent poll cycles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UpdateStatus {
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
}

impl UpdateStatus {
    /// `true` when the most recent cycle succeeded.
    pub fn last_update_success(&self) -> bool {
        self.last_success.is_some() && self.consecutive_failures == 0
    }
}
