//! `run-model <SCRIPT>`: evaluate one topology script and print the
//! canonical topology document as JSON.
//!
//! The script sees the process environment as `env`. Evaluation bounds come
//! from the raven config file, if any; an unreadable config falls back to the
//! defaults with a warning.

#[path = "../error.rs"]
mod error;

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use raven_config::Config;
use raven_core::Evaluator;

use crate::error::CliError;

/// Evaluate a raven topology script
#[derive(Debug, Parser)]
#[command(name = "run-model", version, about = "Evaluate a raven topology script")]
struct Args {
    /// Path to the topology script
    #[arg(value_name = "SCRIPT")]
    script: PathBuf,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(&args) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            std::process::exit(code);
        }
    }
}

fn run(args: &Args) -> Result<String, CliError> {
    let cfg = raven_config::load_config().unwrap_or_else(|err| {
        warn!(error = %err, "ignoring raven config, using default evaluation limits");
        Config::default()
    });
    let source = std::fs::read_to_string(&args.script).map_err(|source| CliError::ReadScript {
        path: args.script.display().to_string(),
        source,
    })?;

    let env: BTreeMap<String, String> = if cfg.eval.inherit_env {
        std::env::vars().collect()
    } else {
        BTreeMap::new()
    };

    let topology = Evaluator::new(cfg.eval_limits())
        .evaluate(&source, &env)
        .map_err(|e| CliError::from_script(e, &args.script, &source))?;

    serde_json::to_string_pretty(&topology).map_err(|e| CliError::Render(e.to_string()))
}
