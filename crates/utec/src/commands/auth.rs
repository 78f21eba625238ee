//! Auth subcommand handlers: authorization-code flow and token upkeep.

use tracing::info;
use uuid::Uuid;

use utec_api::UhomeClient;

use crate::cli::{AuthArgs, AuthCommand, GlobalOpts};
use crate::config::ResolvedProfile;
use crate::error::CliError;
use crate::output;

use super::persist_rotated_tokens;

/// The redirect URI from the flag or the profile, checked to be absolute.
fn redirect_uri(flag: Option<String>, resolved: &ResolvedProfile) -> Result<String, CliError> {
    let uri = flag
        .or_else(|| resolved.redirect_uri.clone())
        .ok_or_else(|| CliError::Validation {
            field: "redirect_uri".into(),
            reason: "pass --redirect-uri or set redirect_uri in the profile".into(),
        })?;
    url::Url::parse(&uri).map_err(|e| CliError::Validation {
        field: "redirect_uri".into(),
        reason: format!("{uri}: {e}"),
    })?;
    Ok(uri)
}

pub async fn handle(
    args: AuthArgs,
    resolved: &ResolvedProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let client = resolved.account.build_client()?;
    let result = run(args.command, &client, resolved, global).await;

    // Keep whatever the grant produced, even if a later step failed.
    persist_rotated_tokens(client.credentials(), resolved);
    result
}

async fn run(
    command: AuthCommand,
    client: &UhomeClient,
    resolved: &ResolvedProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match command {
        AuthCommand::Url {
            redirect_uri: flag,
            state,
        } => {
            let redirect = redirect_uri(flag, resolved)?;
            let state = state.unwrap_or_else(|| Uuid::new_v4().simple().to_string());
            let url = client.authorize_url(&redirect, &state);
            if !global.quiet {
                eprintln!("Open this URL, approve access, then run: utec auth exchange <code>");
            }
            output::print_output(url.as_str(), false);
            Ok(())
        }

        AuthCommand::Exchange {
            code,
            redirect_uri: flag,
        } => {
            let redirect = redirect_uri(flag, resolved)?;
            client.exchange_code(&code, &redirect).await?;
            info!(profile = %resolved.name, "authorization code exchanged");
            report(global, "Tokens stored for profile", &resolved.name);
            Ok(())
        }

        AuthCommand::Refresh => {
            client.refresh_access_token().await?;
            report(global, "Access token refreshed for profile", &resolved.name);
            Ok(())
        }

        AuthCommand::Check => {
            client.authenticate().await?;
            let devices = client.try_list_devices().await?;
            let summary = format!(
                "✓ Authenticated as {}; {} devices",
                client.credentials().client_id(),
                devices.len()
            );
            output::print_output(&summary, global.quiet);
            Ok(())
        }

        AuthCommand::Login { client_credentials } => {
            if client_credentials {
                client.client_credentials().await?;
            } else {
                client.action_login().await?;
            }
            report(global, "Logged in; tokens stored for profile", &resolved.name);
            Ok(())
        }
    }
}

fn report(global: &GlobalOpts, message: &str, profile: &str) {
    if !global.quiet {
        eprintln!("✓ {message} '{profile}'");
    }
}
