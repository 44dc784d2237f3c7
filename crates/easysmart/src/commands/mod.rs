//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod apply;
pub mod config_cmd;
pub mod info;
pub mod show;
pub mod take_ownership;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a switch-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Apply(args) => apply::handle(args, global).await,
        Command::Show => show::handle(global).await,
        Command::Info => info::handle(global).await,
        Command::TakeOwnership(args) => take_ownership::handle(args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are not switch commands".into(),
        )),
    }
}

/// `changed: true|false`, as `apply` and `take-ownership` report it.
pub(crate) fn changed_line(changed: bool) -> String {
    format!("changed: {changed}")
}
