//! Command dispatch: bridges CLI args -> hub calls -> output formatting.

pub mod buttons;
pub mod config_cmd;
pub mod loads;
pub mod watch;

use wiser_core::Hub;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Loads(args) => loads::handle(hub, args, global).await,
        Command::Buttons(args) => buttons::handle(hub, args, global).await,
        Command::Watch(args) => watch::handle(hub, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
