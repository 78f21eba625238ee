// utec-api: Async Rust client for the U-tec / Ultraloq cloud API

pub mod auth;
pub mod client;
pub mod devices;
pub mod envelope;
pub mod error;
pub mod lock;
pub mod models;
pub mod oauth;
pub mod transport;

pub use auth::{Credentials, OAUTH_SCOPE, TokenSet};
pub use client::UhomeClient;
pub use envelope::{Action, Envelope};
pub use error::Error;
pub use lock::LockCommand;
pub use models::{CapabilityState, DeviceRecord, QueriedDevice, StatusMap};
pub use transport::{DEFAULT_API_BASE, DEFAULT_OAUTH_BASE, Endpoints, TransportConfig};
