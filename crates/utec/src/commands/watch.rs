//! `utec watch`: follow coordinator snapshots until interrupted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use utec_core::{Account, Device, LockState, Snapshot};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// One device whose observable state differs from the previous snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    pub at: Option<DateTime<Utc>>,
    pub device_id: String,
    pub name: String,
    pub online: Option<bool>,
    pub lock_state: Option<LockState>,
    pub battery: Option<u8>,
}

impl WatchEvent {
    fn new(device: &Device, at: Option<DateTime<Utc>>) -> Self {
        Self {
            at,
            device_id: device.id.clone(),
            name: device.display_name(),
            online: device.status.online,
            lock_state: device.is_lock().then_some(device.status.lock_state),
            battery: device.status.battery,
        }
    }

    fn line(&self, color: bool) -> String {
        let at = self
            .at
            .map_or_else(|| "-".into(), |t| t.format("%H:%M:%S").to_string());
        let state = self
            .lock_state
            .map(|s| format!(" {}", output::paint_lock_state(s, color)))
            .unwrap_or_default();
        format!(
            "{at} {} ({}){state} battery={} online={}",
            self.name,
            self.device_id,
            output::battery_label(self.battery),
            output::flag_label(self.online),
        )
    }
}

/// Devices that are new in `next` or whose online flag, lock state or
/// battery level moved since `prev`.
pub fn changes(prev: &Snapshot, next: &Snapshot) -> Vec<WatchEvent> {
    next.devices
        .values()
        .filter(|d| {
            prev.device(&d.id).is_none_or(|old| {
                old.status.online != d.status.online
                    || old.status.lock_state != d.status.lock_state
                    || old.status.battery != d.status.battery
            })
        })
        .map(|d| WatchEvent::new(d, next.fetched_at))
        .collect()
}

fn emit(events: &[WatchEvent], global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    for event in events {
        let out = output::render_single(
            &global.output,
            event,
            |e| e.line(color),
            |e| {
                let state = e.lock_state.unwrap_or_default();
                format!("{} {state}", e.device_id)
            },
        )?;
        output::print_output(&out, global.quiet);
    }
    Ok(())
}

/// Print changes until Ctrl-C. Failed polls are logged by the coordinator
/// and leave the last known state on screen.
pub async fn handle(account: &Account, global: &GlobalOpts) -> Result<(), CliError> {
    let coordinator = account.coordinator();
    let color = output::should_color(&global.color);
    let mut stream = coordinator.subscribe();

    if !global.quiet {
        eprintln!(
            "Watching {} devices, polling every {}s. Press Ctrl-C to stop.",
            stream.current().len(),
            coordinator.interval().as_secs()
        );
    }

    let mut previous = stream.current().clone();
    emit(&changes(&Snapshot::default(), &previous), global, color)?;

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            next = stream.changed() => {
                let Some(snapshot) = next else { break };
                emit(&changes(&previous, &snapshot), global, color)?;
                previous = snapshot;
            }
        }
    }

    let status = coordinator.update_status();
    debug!(
        last_success = ?status.last_success,
        consecutive_failures = status.consecutive_failures,
        "watch stopped"
    );
    Ok(())
}
