//! Command dispatch: bridges CLI args -> core operations -> output formatting.

pub mod config_cmd;
pub mod lifecycle;
pub mod model;
pub mod util;

use raven_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a script or backend command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    match cmd {
        Command::Model(args) => model::model(args, global, cfg).await,
        Command::Graph(args) => model::graph(args, global, cfg).await,
        Command::Inspect(args) => model::inspect_entity(args, global, cfg).await,
        Command::Push(args) => lifecycle::push(args, global, cfg).await,
        Command::Mount(args) => lifecycle::mount(args, global, cfg).await,
        Command::Launch(args) => lifecycle::launch(args, global, cfg).await,
        Command::Configure(args) => lifecycle::configure(args, global, cfg).await,
        Command::Destroy(args) => lifecycle::destroy(args, global, cfg).await,
        Command::Status(args) => lifecycle::status(args, global, cfg).await,
        Command::Watch(args) => lifecycle::watch(args, global, cfg).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are not dispatched".into(),
        )),
    }
}
