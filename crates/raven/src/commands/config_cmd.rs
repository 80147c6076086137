//! Config subcommand handlers.

use raven_config::{self as config, Config};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(
                global.output,
                &cfg,
                |c: &Config| toml::to_string_pretty(c).unwrap_or_else(|e| format!("# {e}")),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(out.trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Init { force } => {
            let path = config::init_config(force)?;
            if !global.quiet {
                eprintln!("wrote default configuration to {}", path.display());
            }
            Ok(())
        }
    }
}
