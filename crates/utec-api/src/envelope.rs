// The `{header, payload}` wrapper used by every action-endpoint call.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PAYLOAD_VERSION: &str = "1";

/// A `namespace/name` pair addressing one operation on the action endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Action {
    pub namespace: &'static str,
    pub name: &'static str,
}

impl Action {
    pub const AUTH_REQUEST: Self = Self::new("Uhome.Auth", "Request");
    pub const DEVICE_LIST: Self = Self::new("Uhome.Device", "List");
    pub const DEVICE_STATUS: Self = Self::new("Uhome.Device", "Status");
    pub const DEVICE_QUERY: Self = Self::new("Uhome.Device", "Query");
    pub const DEVICE_COMMAND: Self = Self::new("Uhome.Device", "Command");
    pub const LOCK: Self = Self::new("Uhome.Lock.Control", "Lock");
    pub const UNLOCK: Self = Self::new("Uhome.Lock.Control", "Unlock");
    pub const SYSTEM_CHECK: Self = Self::new("Uhome.System", "Check");

    pub const fn new(namespace: &'static str, name: &'static str) -> Self {
        Self { namespace, name }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub namespace: String,
    pub name: String,
    pub message_id: String,
    pub payload_version: String,
}

/// Outbound request body.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<P> {
    pub header: Header,
    pub payload: P,
}

impl<P: Serialize> Envelope<P> {
    /// Wrap `payload` for `action` with a freshly minted message id.
    ///
    /// Retries must build a new envelope; message ids are never reused.
    pub fn new(action: Action, payload: P) -> Self {
        Self {
            header: Header {
                namespace: action.namespace.to_owned(),
                name: action.name.to_owned(),
                message_id: Uuid::new_v4().to_string(),
                payload_version: PAYLOAD_VERSION.to_owned(),
            },
            payload,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.header.message_id
    }
}

/// Inbound response body. Only `payload` is consumed.
#[derive(Debug, Deserialize)]
pub(crate) struct ResponseEnvelope {
    #[serde(default)]
    pub payload: serde_json::Value,
}
