// ── API-to-domain conversions ──
//
// Turns loosely typed `utec_api` records into `model` types. Status
// parsing never fails: anything missing or malformed becomes unknown.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Value};

use utec_api::DeviceRecord;

use crate::model::{Device, DeviceStatus, LockState, Snapshot};

// ── Helpers ────────────────────────────────────────────────────────

/// First present key among `keys`.
fn field<'a>(status: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| status.get(*k).filter(|v| !v.is_null()))
}

/// Battery percentage from a number or numeric string, `None` outside 0..=100.
fn parse_battery(value: &Value) -> Option<u8> {
    let level = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !(0.0..=100.0).contains(&level) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::as_conversions)]
    Some(level.round() as u8)
}

fn parse_online(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "online" | "true" | "connected" => Some(true),
            "offline" | "false" | "disconnected" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_lock_state(value: &Value) -> Option<LockState> {
    value.as_str().map(LockState::from_wire)
}

// ── Status ─────────────────────────────────────────────────────────

/// Parse a status object in either the flat or the capability shape.
///
/// Flat keys win; `states[]` capability entries fill whatever is left.
pub fn parse_status(raw: &Map<String, Value>) -> DeviceStatus {
    let mut status = DeviceStatus {
        online: field(raw, &["online"]).and_then(parse_online),
        battery: field(raw, &["battery", "battery_level"]).and_then(parse_battery),
        lock_state: field(raw, &["state", "lock_state"])
            .and_then(parse_lock_state)
            .unwrap_or_default(),
        last_operated_by: field(raw, &["last_operated_by"])
            .and_then(Value::as_str)
            .map(str::to_owned),
    };

    let states = raw.get("states").and_then(Value::as_array);
    for entry in states.into_iter().flatten() {
        let Some(capability) = entry.get("capability").and_then(Value::as_str) else {
            continue;
        };
        let value = entry.get("value").unwrap_or(&Value::Null);

        match capability {
            "st.Lock" | "st.lock" if status.lock_state == LockState::Unknown => {
                status.lock_state = parse_lock_state(value).unwrap_or_default();
            }
            "st.BatteryLevel" if status.battery.is_none() => {
                status.battery = parse_battery(value);
            }
            "st.Healthcheck" if status.online.is_none() => {
                status.online = parse_online(value);
            }
            _ => {}
        }
    }

    status
}

// ── Device ─────────────────────────────────────────────────────────

impl From<DeviceRecord> for Device {
    fn from(record: DeviceRecord) -> Self {
        let status = parse_status(&record.status);
        Device {
            id: record.id,
            name: record.name,
            device_type: record.device_type,
            model: record.model,
            firmware_version: record.firmware_version,
            status,
            raw_status: record.status,
        }
    }
}

impl Snapshot {
    /// Build a snapshot from merged records, preserving their order.
    pub fn from_records(records: IndexMap<String, DeviceRecord>, fetched_at: DateTime<Utc>) -> Self {
        Snapshot {
            devices: records
                .into_iter()
                .map(|(id, record)| (id, Device::from(record)))
                .collect(),
            fetched_at: Some(fetched_at),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn obj(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn flat_status() {
        let status = parse_status(&obj(json!({
            "online": true,
            "battery": 87,
            "state": "locked",
            "last_operated_by": "Alice"
        })));

        assert_eq!(
            status,
            DeviceStatus {
                online: Some(true),
                battery: Some(87),
                lock_state: LockState::Locked,
                last_operated_by: Some("Alice".into()),
            }
        );
    }

    #[test]
    fn capability_status() {
        let status = parse_status(&obj(json!({
            "states": [
                { "capability": "st.Healthcheck", "name": "status", "value": "Online" },
                { "capability": "st.Lock", "name": "lockState", "value": "Unlocked" },
                { "capability": "st.BatteryLevel", "name": "level", "value": 42 },
                { "name": "no capability" }
            ]
        })));

        assert_eq!(status.online, Some(true));
        assert_eq!(status.lock_state, LockState::Unlocked);
        assert_eq!(status.battery, Some(42));
        assert_eq!(status.last_operated_by, None);
    }

    #[test]
    fn malformed_fields_become_unknown() {
        let status = parse_status(&obj(json!({
            "online": "maybe",
            "battery": 140,
            "lock_state": "ajar",
            "last_operated_by": 7
        })));
        assert_eq!(status, DeviceStatus::default());

        let status = parse_status(&obj(json!({ "battery_level": "not a number" })));
        assert_eq!(status.battery, None);
    }

    #[test]
    fn flat_keys_take_precedence_over_capabilities() {
        let status = parse_status(&obj(json!({
            "lock_state": "jammed",
            "battery_level": "55.4",
            "states": [
                { "capability": "st.lock", "value": "locked" },
                { "capability": "st.BatteryLevel", "value": 10 }
            ]
        })));
        assert_eq!(status.lock_state, LockState::Jammed);
        assert_eq!(status.battery, Some(55));
    }

    #[test]
    fn snapshot_keeps_list_order() {
        let mut records = IndexMap::new();
        for id in ["z", "a", "m"] {
            let record = DeviceRecord::from_value(&json!({ "id": id, "type": "lock" })).unwrap();
            records.insert(id.to_owned(), record);
        }

        let snapshot = Snapshot::from_records(records, Utc::now());
        let ids: Vec<&str> = snapshot.devices.keys().map(String::as_str).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
        assert_eq!(snapshot.locks().count(), 3);
    }
}
