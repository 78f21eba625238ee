// utec-core: Poll coordinator and entity layer between utec-api and consumers.

pub mod account;
pub mod config;
pub mod convert;
pub mod coordinator;
pub mod entity;
pub mod error;
pub mod model;
pub mod source;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use account::{Account, ValidationError};
pub use config::{AccountConfig, DEFAULT_SCAN_INTERVAL, DEFAULT_TIMEOUT};
pub use coordinator::Coordinator;
pub use entity::{BatterySensor, DeviceInfo, Entity, LockEntity};
pub use error::CoreError;
pub use model::{Device, DeviceStatus, LockState, Snapshot, UpdateStatus};
pub use source::{DeviceSource, LockControl};
pub use stream::SnapshotStream;
