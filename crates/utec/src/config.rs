//! CLI configuration: thin wrapper around `utec_config` shared types.
//!
//! Adds profile resolution that respects `GlobalOpts` flag overrides
//! (--profile, --client-id, --client-secret, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use utec_core::AccountConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use utec_config::{Config, Profile, config_path, load_config_or_default, save_config};

// ── CLI-specific helpers ────────────────────────────────────────────

/// A profile resolved against flags, ready to build an account.
#[derive(Debug)]
pub struct ResolvedProfile {
    /// Name under which rotated tokens are persisted.
    pub name: String,
    pub account: AccountConfig,
    pub redirect_uri: Option<String>,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Resolve the active profile and apply CLI flag overrides.
///
/// Without a matching profile, `--client-id` (plus a client secret from
/// the flag, env or keyring) is enough to build an ad-hoc profile.
pub fn resolve(global: &GlobalOpts) -> Result<ResolvedProfile, CliError> {
    let cfg = load_config_or_default();
    let name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None => {
            let Some(ref client_id) = global.client_id else {
                if global.profile.is_some() {
                    return Err(CliError::ProfileNotFound {
                        name,
                        available: available_profiles(&cfg),
                    });
                }
                return Err(CliError::NoConfig {
                    path: config_path().display().to_string(),
                });
            };
            Profile {
                client_id: client_id.clone(),
                ..Profile::default()
            }
        }
    };

    if let Some(ref client_id) = global.client_id {
        profile.client_id.clone_from(client_id);
    }
    if let Some(ref secret) = global.client_secret {
        profile.client_secret = Some(secret.clone());
    }

    let mut account = utec_config::profile_to_account_config(&profile, &name, &cfg.defaults)?;

    // The keyring outranks plaintext during resolution; an explicit flag
    // outranks both.
    if let Some(ref secret) = global.client_secret {
        account.client_secret = SecretString::from(secret.clone());
    }
    if let Some(secs) = global.timeout {
        account.timeout = Duration::from_secs(secs);
    }

    Ok(ResolvedProfile {
        name,
        account,
        redirect_uri: profile.redirect_uri,
    })
}
