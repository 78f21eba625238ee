// Lock commands
//
// `Uhome.Lock.Control/Lock|Unlock` with `{device_id}`. The reply body is
// ignored; success is the HTTP status alone.

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::UhomeClient;
use crate::envelope::Action;
use crate::error::Error;

/// Direction of a lock command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCommand {
    Lock,
    Unlock,
}

impl LockCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }

    pub fn action(self) -> Action {
        match self {
            Self::Lock => Action::LOCK,
            Self::Unlock => Action::UNLOCK,
        }
    }
}

impl UhomeClient {
    /// Send a lock command, propagating failures.
    pub async fn send_lock_command(&self, device_id: &str, command: LockCommand) -> Result<(), Error> {
        self.request_status(command.action(), json!({ "device_id": device_id }))
            .await?;
        info!(device_id, ?command, "lock command accepted");
        Ok(())
    }

    /// Lock `device_id`. Returns `false` if the server rejected the command.
    pub async fn lock(&self, device_id: &str) -> bool {
        self.command_ok(device_id, LockCommand::Lock).await
    }

    /// Unlock `device_id`. Returns `false` if the server rejected the command.
    pub async fn unlock(&self, device_id: &str) -> bool {
        self.command_ok(device_id, LockCommand::Unlock).await
    }

    /// Generic capability command via `Uhome.Device/Command`.
    ///
    /// `{"devices":[{"id":..,"command":{"capability":..,"name":..,"arguments":..}}]}`
    pub async fn device_command(
        &self,
        device_id: &str,
        capability: &str,
        name: &str,
        arguments: Option<Value>,
    ) -> Result<Value, Error> {
        let mut command = json!({ "capability": capability, "name": name });
        if let Some(args) = arguments {
            command["arguments"] = args;
        }
        self.request(
            Action::DEVICE_COMMAND,
            json!({ "devices": [{ "id": device_id, "command": command }] }),
        )
        .await
    }

    async fn command_ok(&self, device_id: &str, command: LockCommand) -> bool {
        match self.send_lock_command(device_id, command).await {
            Ok(()) => true,
            Err(e) => {
                warn!(device_id, ?command, error = %e, "lock command failed");
                false
            }
        }
    }
}
