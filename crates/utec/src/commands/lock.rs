//! `utec lock` / `utec unlock`.

use tracing::info;

use utec_api::LockCommand;
use utec_core::{Account, LockState};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::status::LockReport;

pub async fn handle(
    account: &Account,
    command: LockCommand,
    device_id: &str,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let lock = account.lock_entity(device_id)?;

    match command {
        LockCommand::Lock => lock.lock().await?,
        LockCommand::Unlock => lock.unlock().await?,
    }
    info!(device_id, command = command.as_str(), "command accepted");

    // The entity refreshed after the command; report what the cloud says now.
    let report = LockReport::new(account, lock);
    let expected = match command {
        LockCommand::Lock => LockState::Locked,
        LockCommand::Unlock => LockState::Unlocked,
    };
    if report.state != expected && !global.quiet {
        eprintln!(
            "{} accepted; the cloud still reports '{}'. Check again with: utec status",
            command.as_str(),
            report.state
        );
    }

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &report,
        |r| r.detail(color),
        |r| format!("{} {}", r.device_id, r.state),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
