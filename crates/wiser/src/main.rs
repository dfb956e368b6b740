//! `wiser`: command line client for Wiser by Feller hubs.
//!
//! Logs go to stderr so that stdout carries only command output and stays
//! safe to pipe into `jq` and friends.

mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use wiser_core::Hub;

use crate::cli::{Cli, Command, CompletionsArgs, GlobalOpts};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    install_logging(&cli.global);

    let result = match cli.command {
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Completions(args) => {
            print_completions(&args);
            Ok(())
        }
        cmd => match build_hub(&cli.global) {
            Ok(hub) => commands::dispatch(cmd, &hub, &cli.global).await,
            Err(err) => Err(err),
        },
    };

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Default level for `-v` counts; `-q` keeps only errors. `RUST_LOG` wins.
fn log_level(global: &GlobalOpts) -> &'static str {
    if global.quiet {
        return "error";
    }
    match global.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn install_logging(global: &GlobalOpts) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level(global)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Resolve the active profile and flags into a ready `Hub`. The push
/// channel stays closed until a command asks for it.
fn build_hub(global: &GlobalOpts) -> Result<Hub, CliError> {
    let cfg = config::load_config_or_default();
    let hub_config = config::build_hub_config(global, &cfg)?;
    tracing::debug!(host = %hub_config.host, "hub resolved");
    Ok(Hub::new(hub_config)?)
}

fn print_completions(args: &CompletionsArgs) {
    clap_complete::generate(
        args.shell,
        &mut Cli::command(),
        "wiser",
        &mut std::io::stdout(),
    );
}
