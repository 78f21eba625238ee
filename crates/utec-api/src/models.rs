// Wire types for the action and token endpoints.
//
// The server controls these shapes and they drift between firmware
// generations, so device records are read field-by-field from raw JSON
// rather than through a strict derive.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status object as returned by `Uhome.Device/Status`.
pub type StatusMap = Map<String, Value>;

/// A device entry from `Uhome.Device/List`, with its status merged in
/// by [`get_devices_with_status`](crate::UhomeClient::get_devices_with_status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    #[serde(default)]
    pub status: StatusMap,
}

impl DeviceRecord {
    /// Read a record from a raw list entry.
    ///
    /// Returns `None` when the entry has no usable id. Numeric ids are
    /// stringified. Missing optional fields stay `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = match obj.get("id")? {
            Value::String(s) if !s.is_empty() => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let info = obj.get("deviceInfo").and_then(Value::as_object);

        Some(Self {
            id,
            name: str_field(obj, &["name"]),
            device_type: str_field(obj, &["type", "category"]),
            model: str_field(obj, &["model"]).or_else(|| info.and_then(|i| str_field(i, &["model"]))),
            firmware_version: str_field(obj, &["firmware_version", "firmwareVersion"])
                .or_else(|| info.and_then(|i| str_field(i, &["firmwareVersion", "hwVersion"]))),
            status: obj
                .get("status")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

/// First non-empty string among `keys`.
fn str_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_owned)
}

/// One capability reading from `Uhome.Device/Query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityState {
    pub capability: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Per-device result of `Uhome.Device/Query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueriedDevice {
    pub id: String,
    #[serde(default)]
    pub states: Vec<CapabilityState>,
}

/// JSON body returned by the OAuth token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_flat_record() {
        let rec = DeviceRecord::from_value(&json!({
            "id": "lock-1",
            "name": "Front Door",
            "type": "lock",
            "model": "U-Bolt Pro",
            "firmware_version": "1.2.3"
        }))
        .unwrap();

        assert_eq!(rec.id, "lock-1");
        assert_eq!(rec.name.as_deref(), Some("Front Door"));
        assert_eq!(rec.device_type.as_deref(), Some("lock"));
        assert_eq!(rec.model.as_deref(), Some("U-Bolt Pro"));
        assert_eq!(rec.firmware_version.as_deref(), Some("1.2.3"));
        assert!(rec.status.is_empty());
    }

    #[test]
    fn falls_back_to_category_and_device_info() {
        let rec = DeviceRecord::from_value(&json!({
            "id": 42,
            "category": "lock",
            "deviceInfo": { "model": "Latch 5", "firmwareVersion": "9.0" }
        }))
        .unwrap();

        assert_eq!(rec.id, "42");
        assert_eq!(rec.device_type.as_deref(), Some("lock"));
        assert_eq!(rec.model.as_deref(), Some("Latch 5"));
        assert_eq!(rec.firmware_version.as_deref(), Some("9.0"));
        assert!(rec.name.is_none());
    }

    #[test]
    fn rejects_entries_without_id() {
        assert!(DeviceRecord::from_value(&json!({ "name": "ghost" })).is_none());
        assert!(DeviceRecord::from_value(&json!({ "id": "" })).is_none());
        assert!(DeviceRecord::from_value(&json!({ "id": null })).is_none());
        assert!(DeviceRecord::from_value(&json!("lock-1")).is_none());
    }

    #[test]
    fn token_response_tolerates_missing_fields() {
        let resp: TokenResponse = serde_json::from_value(json!({ "error": "invalid_grant" })).unwrap();
        assert!(resp.access_token.is_none());
        assert!(resp.expires_in.is_none());
    }
}
