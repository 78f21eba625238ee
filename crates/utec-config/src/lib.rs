//! Shared configuration for the utec CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! token persistence, and translation to `utec_core::AccountConfig`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use utec_core::AccountConfig;

/// Service name under which secrets are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "utec";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("could not encode configuration as TOML: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("could not load configuration: {0}")]
    Figment(Box<figment::Error>),

    #[error("could not parse {path} as TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named account profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds between polls in `watch`.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            scan_interval: default_scan_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_scan_interval() -> u64 {
    30
}

/// A named U-tec account profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// OAuth client id from the U-tec developer console.
    pub client_id: String,

    /// Client secret in plaintext. The keyring and `client_secret_env` take precedence.
    pub client_secret: Option<String>,

    /// Environment variable name containing the client secret.
    pub client_secret_env: Option<String>,

    /// Access token (plaintext fallback when no keyring is available).
    pub access_token: Option<String>,

    /// Refresh token (plaintext fallback when no keyring is available).
    pub refresh_token: Option<String>,

    /// Override the action API host.
    pub api_url: Option<String>,

    /// Override the OAuth host.
    pub oauth_url: Option<String>,

    /// Redirect URI registered for the authorization-code flow.
    pub redirect_uri: Option<String>,

    /// Poll interval for this profile, in seconds.
    pub scan_interval: Option<u64>,

    /// Request timeout for this profile, in seconds.
    pub timeout: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// `<config dir>/utec/config.toml` for the current platform.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "utec", "utec").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("utec");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, layered over defaults and under `UTEC_` env vars.
///
/// Nested keys use a double underscore: `UTEC_DEFAULTS__TIMEOUT=5`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UTEC_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Like [`load_config`], but an unreadable or missing file yields `Config::default()`.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Write `cfg` as TOML to [`config_path`], creating the directory if needed.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ─────────────────────────────────────────────────────────

fn keyring_entry(profile_name: &str, key: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/{key}"),
    )?)
}

fn keyring_get(profile_name: &str, key: &str) -> Option<SecretString> {
    keyring_entry(profile_name, key)
        .ok()?
        .get_password()
        .ok()
        .map(SecretString::from)
}

/// Store a secret for `profile_name` under `key` (e.g. `client-secret`).
pub fn store_secret(profile_name: &str, key: &str, value: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name, key)?.set_password(value.expose_secret())?;
    debug!(profile = profile_name, key, "stored secret in keyring");
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the client secret: env var named by the profile, then the
/// system keyring, then plaintext.
pub fn resolve_client_secret(
    profile: &Profile,
    profile_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's client_secret_env → env var lookup
    if let Some(ref env_name) = profile.client_secret_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Some(secret) = keyring_get(profile_name, "client-secret") {
        return Ok(secret);
    }

    // 3. Plaintext in config
    if let Some(ref secret) = profile.client_secret {
        return Ok(SecretString::from(secret.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Persisted `(access, refresh)` tokens: keyring first, then plaintext.
pub fn resolve_tokens(
    profile: &Profile,
    profile_name: &str,
) -> (Option<SecretString>, Option<SecretString>) {
    let access = keyring_get(profile_name, "access-token")
        .or_else(|| profile.access_token.clone().map(SecretString::from));
    let refresh = keyring_get(profile_name, "refresh-token")
        .or_else(|| profile.refresh_token.clone().map(SecretString::from));
    (access, refresh)
}

// ── Token persistence ───────────────────────────────────────────────

/// Where rotated tokens ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStorage {
    Keyring,
    Plaintext,
}

/// Persist a rotated token pair for `profile_name`.
///
/// Tries the keyring first. If that fails the tokens are written into
/// the profile at `path` in plaintext.
pub fn persist_tokens(
    path: &Path,
    profile_name: &str,
    access: Option<&SecretString>,
    refresh: Option<&SecretString>,
) -> Result<TokenStorage, ConfigError> {
    match store_tokens_in_keyring(profile_name, access, refresh) {
        Ok(()) => return Ok(TokenStorage::Keyring),
        Err(e) => debug!(error = %e, "keyring write failed"),
    }

    write_tokens_to_file(path, profile_name, access, refresh)?;
    debug!(profile = profile_name, "keyring unavailable, stored tokens in config file");
    Ok(TokenStorage::Plaintext)
}

/// Set the token keys of one profile in the file at `path`.
///
/// Edits the raw TOML document, so defaults and `UTEC_` env overrides
/// active in this process never leak into the file.
fn write_tokens_to_file(
    path: &Path,
    profile_name: &str,
    access: Option<&SecretString>,
    refresh: Option<&SecretString>,
) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let mut doc: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let profile = doc
        .get_mut("profiles")
        .and_then(|p| p.get_mut(profile_name))
        .and_then(toml::Value::as_table_mut)
        .ok_or_else(|| ConfigError::Validation {
            field: "profile".into(),
            reason: format!("profile '{profile_name}' not found"),
        })?;
    write_plaintext_tokens(profile, access, refresh);

    std::fs::write(path, toml::to_string_pretty(&doc)?)?;
    Ok(())
}

fn store_tokens_in_keyring(
    profile_name: &str,
    access: Option<&SecretString>,
    refresh: Option<&SecretString>,
) -> Result<(), ConfigError> {
    if let Some(token) = access {
        store_secret(profile_name, "access-token", token)?;
    }
    if let Some(token) = refresh {
        store_secret(profile_name, "refresh-token", token)?;
    }
    Ok(())
}

fn write_plaintext_tokens(
    profile: &mut toml::Table,
    access: Option<&SecretString>,
    refresh: Option<&SecretString>,
) {
    for (key, token) in [("access_token", access), ("refresh_token", refresh)] {
        if let Some(token) = token {
            profile.insert(key.into(), toml::Value::String(token.expose_secret().to_owned()));
        }
    }
}

// ── Translation to core config ──────────────────────────────────────

/// Build an `AccountConfig` from a profile, applying global defaults.
pub fn profile_to_account_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<AccountConfig, ConfigError> {
    if profile.client_id.trim().is_empty() {
        return Err(ConfigError::Validation {
            field: "client_id".into(),
            reason: "must not be empty".into(),
        });
    }

    let secret = resolve_client_secret(profile, profile_name)?;
    let (access_token, refresh_token) = resolve_tokens(profile, profile_name);

    let mut cfg = AccountConfig::new(profile.client_id.clone(), secret);
    cfg.access_token = access_token;
    cfg.refresh_token = refresh_token;
    if let Some(ref url) = profile.api_url {
        cfg.api_url.clone_from(url);
    }
    if let Some(ref url) = profile.oauth_url {
        cfg.oauth_url.clone_from(url);
    }
    cfg.scan_interval = Duration::from_secs(profile.scan_interval.unwrap_or(defaults.scan_interval));
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout));
    Ok(cfg)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_profile() -> Profile {
        Profile {
            client_id: "cid".into(),
            client_secret: Some("plain-secret".into()),
            redirect_uri: Some("http://localhost:9501".into()),
            scan_interval: Some(60),
            ..Profile::default()
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.profiles.insert("home".into(), sample_profile());
        cfg.default_profile = Some("home".into());
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.default_profile.as_deref(), Some("home"));
        assert_eq!(loaded.profiles["home"], sample_profile());
        assert_eq!(loaded.defaults, Defaults::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.timeout, 10);
        assert_eq!(cfg.defaults.scan_interval, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn partial_defaults_table_is_filled_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[defaults]\noutput = \"json\"\n\n[profiles.home]\nclient_id = \"abc\"\n",
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");
        assert_eq!(cfg.profiles["home"].client_id, "abc");
    }

    #[test]
    fn profile_translation_applies_overrides() {
        let profile = Profile {
            api_url: Some("http://127.0.0.1:8080".into()),
            timeout: None,
            ..sample_profile()
        };

        let cfg = profile_to_account_config(&profile, "utec-test-translation", &Defaults::default())
            .unwrap();
        assert_eq!(cfg.client_id, "cid");
        assert_eq!(cfg.api_url, "http://127.0.0.1:8080");
        assert_eq!(cfg.oauth_url, "https://oauth.u-tec.com");
        assert_eq!(cfg.scan_interval, Duration::from_secs(60));
        assert_eq!(cfg.timeout, Duration::from_secs(10));
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let profile = Profile::default();
        let err = profile_to_account_config(&profile, "x", &Defaults::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }

    #[test]
    fn file_token_write_only_touches_the_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "default_profile = \"home\"\n\n\
             [profiles.home]\n\
             client_id = \"cid\"\n\
             refresh_token = \"old-refresh\"\n\n\
             [profiles.away]\n\
             client_id = \"other\"\n",
        )
        .unwrap();

        write_tokens_to_file(
            &path,
            "home",
            Some(&SecretString::from("new-access".to_owned())),
            None,
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("[defaults]"), "merged layers leaked:\n{text}");
        assert!(!text.contains("timeout"), "merged layers leaked:\n{text}");

        let cfg = load_config_from(&path).unwrap();
        let home = &cfg.profiles["home"];
        assert_eq!(home.access_token.as_deref(), Some("new-access"));
        assert_eq!(home.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(cfg.profiles["away"].access_token, None);
    }

    #[test]
    fn file_token_write_rejects_unknown_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profiles.home]\nclient_id = \"cid\"\n").unwrap();

        let err = write_tokens_to_file(&path, "nope", None, None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }), "got {err:?}");
    }
}
