//! Clap derive structures for the `utec` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// utec -- command-line control for U-tec / Ultraloq smart locks
#[derive(Debug, Parser)]
#[command(
    name = "utec",
    version,
    about = "Control U-tec / Ultraloq smart locks from the command line",
    long_about = "Lock, unlock and monitor U-tec / Ultraloq smart locks through\n\
        the U-tec cloud action API. Accounts are configured as named profiles;\n\
        run `utec config init` to create one.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Account profile to use
    #[arg(long, short = 'p', env = "UTEC_PROFILE", global = true)]
    pub profile: Option<String>,

    /// OAuth client id (overrides profile)
    #[arg(long, env = "UTEC_CLIENT_ID", global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret (overrides profile)
    #[arg(long, env = "UTEC_CLIENT_SECRET", global = true, hide_env = true)]
    pub client_secret: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "UTEC_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Colorize lock states
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// More logging: -v info, -vv debug, -vvv trace
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print nothing but errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "UTEC_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// Pretty-printed JSON
    Json,
    /// JSON on a single line
    JsonCompact,
    /// YAML
    Yaml,
    /// One line per item, for scripts
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect devices on the account
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show lock state and battery level for every lock
    #[command(alias = "st")]
    Status,

    /// Lock a device
    Lock(LockArgs),

    /// Unlock a device
    Unlock(LockArgs),

    /// Poll the account and print state changes as they happen
    Watch(WatchArgs),

    /// OAuth authorization and token management
    Auth(AuthArgs),

    /// Profiles and stored secrets
    Config(ConfigArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List every device with its current status
    #[command(alias = "ls")]
    List,

    /// Show one device in detail
    Get {
        /// Device id
        device_id: String,
    },
}

// ── Lock / Unlock ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LockArgs {
    /// Device id of the lock
    pub device_id: String,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between polls (overrides profile scan_interval)
    #[arg(long, short = 'i')]
    pub interval: Option<u64>,
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Print the browser URL that starts the authorization-code flow
    Url {
        /// Redirect URI registered for this client (overrides profile)
        #[arg(long)]
        redirect_uri: Option<String>,

        /// Opaque state echoed back on the redirect (random if omitted)
        #[arg(long)]
        state: Option<String>,
    },

    /// Exchange an authorization code for a token pair
    Exchange {
        /// The `code` query parameter from the redirect
        code: String,

        /// Redirect URI used in `auth url` (overrides profile)
        #[arg(long)]
        redirect_uri: Option<String>,
    },

    /// Force a refresh of the access token
    Refresh,

    /// Verify stored tokens and count devices on the account
    Check,

    /// Obtain tokens without a browser
    Login {
        /// Use the client-credentials grant instead of the legacy auth action
        #[arg(long)]
        client_credentials: bool,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a profile with guided setup
    Init,

    /// Print the configuration with secrets masked
    Show,

    /// List profile names; the default is starred
    Profiles,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// Store the active profile's client secret in the system keyring
    SetSecret,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
