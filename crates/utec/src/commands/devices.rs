//! Device command handlers.

use tabled::Tabled;

use utec_core::{Account, CoreError, Device, DeviceInfo};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "Lock")]
    lock: String,
    #[tabled(rename = "Battery")]
    battery: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            id: d.id.clone(),
            name: d.display_name(),
            dtype: d.device_type.clone().unwrap_or_default(),
            model: d.model.clone().unwrap_or_default(),
            online: output::flag_label(d.status.online).into(),
            lock: if d.is_lock() {
                output::paint_lock_state(d.status.lock_state, color)
            } else {
                String::new()
            },
            battery: output::battery_label(d.status.battery),
        }
    }
}

fn detail(d: &Device) -> String {
    let info = DeviceInfo::for_device(d);
    let mut lines = vec![
        format!("ID:        {}", d.id),
        format!("Name:      {}", info.name),
        format!("Type:      {}", d.device_type.as_deref().unwrap_or("-")),
        format!("Make:      {}", info.manufacturer),
        format!("Model:     {}", info.model),
        format!("Firmware:  {}", info.sw_version),
        format!("Online:    {}", output::flag_label(d.status.online)),
        format!("Battery:   {}", output::battery_label(d.status.battery)),
    ];
    if d.is_lock() {
        lines.push(format!("Lock:      {}", d.status.lock_state));
        if let Some(ref who) = d.status.last_operated_by {
            lines.push(format!("Last by:   {who}"));
        }
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(account: &Account, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = account.coordinator().snapshot();
    let color = output::should_color(&global.color);

    let out = match args.command {
        DevicesCommand::List => {
            let devices: Vec<&Device> = snapshot.devices.values().collect();
            output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::new(d, color),
                |d| d.id.clone(),
            )?
        }
        DevicesCommand::Get { device_id } => {
            let device = snapshot
                .device(&device_id)
                .ok_or_else(|| CoreError::DeviceNotFound {
                    identifier: device_id.clone(),
                })?;
            output::render_single(&global.output, device, detail, |d| d.id.clone())?
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
