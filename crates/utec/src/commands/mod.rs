//! Command handlers, one module per top-level subcommand.

pub mod auth;
pub mod config_cmd;
pub mod devices;
pub mod lock;
pub mod status;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use utec_api::{Credentials, LockCommand};
use utec_core::Account;

use crate::cli::{AuthArgs, DevicesArgs, GlobalOpts, WatchArgs};
use crate::config::{self, ResolvedProfile};
use crate::error::CliError;

/// Commands that run against a set-up [`Account`].
#[derive(Debug)]
pub enum AccountCommand {
    Devices(DevicesArgs),
    Status,
    Lock(LockCommand, String),
    Watch(WatchArgs),
}

/// Run an `auth` subcommand against the resolved profile.
pub async fn run_auth(args: AuthArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;
    auth::handle(args, &resolved, global).await
}

/// Set up the account, run `cmd`, persist rotated tokens and unload.
///
/// One-shot commands set up the account without a poll task; `watch`
/// keeps polling at the profile's (or the flag's) interval.
pub async fn dispatch(cmd: AccountCommand, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = config::resolve(global)?;

    let mut account_config = resolved.account.clone();
    account_config.scan_interval = match cmd {
        AccountCommand::Watch(ref args) => args
            .interval
            .map_or(account_config.scan_interval, Duration::from_secs),
        _ => Duration::ZERO,
    };

    let credentials = account_config.credentials();
    let account = match Account::setup_with(&account_config, Arc::clone(&credentials)).await {
        Ok(account) => account,
        Err(e) => {
            persist_rotated_tokens(&credentials, &resolved);
            return Err(e.into());
        }
    };
    debug!(command = ?cmd, profile = %resolved.name, "dispatching command");

    let result = match cmd {
        AccountCommand::Devices(args) => devices::handle(&account, args, global),
        AccountCommand::Status => status::handle(&account, global),
        AccountCommand::Lock(command, device_id) => {
            lock::handle(&account, command, &device_id, global).await
        }
        AccountCommand::Watch(_) => watch::handle(&account, global).await,
    };

    persist_rotated_tokens(&credentials, &resolved);
    account.unload().await;
    result
}

/// Write back tokens the session rotated, so the next run starts from them.
pub fn persist_rotated_tokens(credentials: &Credentials, resolved: &ResolvedProfile) {
    if credentials.generation() == 0 {
        return;
    }
    let tokens = credentials.tokens();
    match utec_config::persist_tokens(
        &config::config_path(),
        &resolved.name,
        tokens.access_token.as_ref(),
        tokens.refresh_token.as_ref(),
    ) {
        Ok(storage) => debug!(?storage, profile = %resolved.name, "persisted rotated tokens"),
        Err(e) => warn!(error = %e, profile = %resolved.name, "could not persist rotated tokens"),
    }
}
