//! `utec status`: lock and battery entities at a glance.

use serde::Serialize;
use tabled::Tabled;

use utec_core::{Account, Entity, LockEntity, LockState};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// What a lock entity currently reports, paired with its battery sensor.
#[derive(Debug, Serialize)]
pub struct LockReport {
    pub unique_id: String,
    pub device_id: String,
    pub name: String,
    pub available: bool,
    pub state: LockState,
    pub battery: Option<u8>,
    pub changed_by: Option<String>,
}

impl LockReport {
    pub fn new(account: &Account, lock: &LockEntity) -> Self {
        let state = if lock.is_jammed() {
            LockState::Jammed
        } else {
            match lock.is_locked() {
                Some(true) => LockState::Locked,
                Some(false) => LockState::Unlocked,
                None => LockState::Unknown,
            }
        };
        let battery = account
            .batteries()
            .iter()
            .find(|b| b.device_id() == lock.device_id())
            .and_then(|b| b.native_value());

        Self {
            unique_id: lock.unique_id().to_owned(),
            device_id: lock.device_id().to_owned(),
            name: lock.name(),
            available: lock.available(),
            state,
            battery,
            changed_by: lock.changed_by(),
        }
    }

    pub fn detail(&self, color: bool) -> String {
        let mut lines = vec![
            format!("Lock:      {} ({})", self.name, self.device_id),
            format!("State:     {}", output::paint_lock_state(self.state, color)),
            format!("Battery:   {}", output::battery_label(self.battery)),
            format!("Available: {}", output::flag_label(Some(self.available))),
        ];
        if let Some(ref who) = self.changed_by {
            lines.push(format!("Last by:   {who}"));
        }
        lines.join("\n")
    }
}

#[derive(Tabled)]
struct LockRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "Last By")]
    changed_by: String,
}

impl LockRow {
    fn new(r: &LockReport, color: bool) -> Self {
        Self {
            id: r.device_id.clone(),
            name: r.name.clone(),
            state: output::paint_lock_state(r.state, color),
            battery: output::battery_label(r.battery),
            available: output::flag_label(Some(r.available)).into(),
            changed_by: r.changed_by.clone().unwrap_or_default(),
        }
    }
}

pub fn handle(account: &Account, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let reports: Vec<LockReport> = account
        .locks()
        .iter()
        .map(|lock| LockReport::new(account, lock))
        .collect();

    if reports.is_empty() && !global.quiet {
        eprintln!("No locks on this account. Run: utec devices list");
    }

    let out = output::render_list(
        &global.output,
        &reports,
        |r| LockRow::new(r, color),
        |r| format!("{} {}", r.device_id, r.state),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
