mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use utec_api::LockCommand;

use crate::cli::{Cli, Command};
use crate::commands::{AccountCommand, dispatch};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `RUST_LOG` wins; otherwise `-v` steps from warn up to trace.
fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need an account
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "utec", &mut std::io::stdout());
            Ok(())
        }

        Command::Auth(args) => commands::run_auth(args, &cli.global).await,

        Command::Devices(args) => dispatch(AccountCommand::Devices(args), &cli.global).await,
        Command::Status => dispatch(AccountCommand::Status, &cli.global).await,
        Command::Lock(args) => {
            dispatch(AccountCommand::Lock(LockCommand::Lock, args.device_id), &cli.global).await
        }
        Command::Unlock(args) => {
            dispatch(AccountCommand::Lock(LockCommand::Unlock, args.device_id), &cli.global).await
        }
        Command::Watch(args) => dispatch(AccountCommand::Watch(args), &cli.global).await,
    }
}
