//! Shared helpers for command handlers.

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::Path;

use tokio_util::sync::CancellationToken;

use raven_config::Config;
use raven_core::{Evaluator, LifecycleClient, Topology};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Read a script file, keeping the path in the error.
pub fn read_script(path: &Path) -> Result<String, CliError> {
    std::fs::read_to_string(path).map_err(|source| CliError::ReadScript {
        path: path.display().to_string(),
        source,
    })
}

/// The `env` object a script sees: the process environment (unless
/// disabled), then every `-e KEY=VALUE` on top.
pub fn script_env(global: &GlobalOpts, cfg: &Config) -> Result<BTreeMap<String, String>, CliError> {
    let mut env: BTreeMap<String, String> = if cfg.eval.inherit_env && !global.no_inherit_env {
        std::env::vars().collect()
    } else {
        BTreeMap::new()
    };

    for binding in &global.env {
        let (key, value) = binding.split_once('=').ok_or_else(|| CliError::Usage {
            field: "--env".into(),
            reason: format!("expected KEY=VALUE, got '{binding}'"),
        })?;
        if key.is_empty() {
            return Err(CliError::Usage {
                field: "--env".into(),
                reason: format!("empty key in '{binding}'"),
            });
        }
        env.insert(key.to_owned(), value.to_owned());
    }
    Ok(env)
}

/// Evaluate and validate the script at `path`. Ctrl-C cancels the run.
pub async fn evaluate_script(
    path: &Path,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<Topology, CliError> {
    let source = read_script(path)?;
    let env = script_env(global, cfg)?;
    let evaluator = Evaluator::new(cfg.eval_limits());

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    tracing::debug!(script = %path.display(), bindings = env.len(), "evaluating script");
    let result = evaluator
        .evaluate_async(source.clone(), env, cancel)
        .await;
    interrupt.abort();

    result.map_err(|e| CliError::from_script(e, path, &source))
}

/// Build a lifecycle client from config plus `--backend` / `--timeout`.
pub fn lifecycle_client(global: &GlobalOpts, cfg: &Config) -> Result<LifecycleClient, CliError> {
    let mut backend = cfg.backend_config(global.backend.as_deref())?;
    if let Some(secs) = global.timeout {
        backend.timeout = std::time::Duration::from_secs(secs);
    }
    tracing::debug!(url = %backend.url, "using backend");
    Ok(LifecycleClient::new(&backend)?)
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Usage {
            field: "interactive".into(),
            reason: format!("prompt failed: {e}"),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["rvn"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["model", "t.js"]);
        Cli::parse_from(argv).global
    }

    #[test]
    fn explicit_bindings_override() {
        let cfg = Config::default();
        let env = script_env(&global(&["--no-inherit-env", "-e", "A=1", "-e", "B=x=y"]), &cfg).unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env["A"], "1");
        assert_eq!(env["B"], "x=y");
    }

    #[test]
    fn malformed_binding_is_usage_error() {
        let cfg = Config::default();
        let err = script_env(&global(&["-e", "NOEQUALS"]), &cfg).unwrap_err();
        assert!(matches!(err, CliError::Usage { .. }));
        let err = script_env(&global(&["-e", "=v"]), &cfg).unwrap_err();
        assert!(matches!(err, CliError::Usage { .. }));
    }

    #[test]
    fn inherit_env_follows_config() {
        let mut cfg = Config::default();
        cfg.eval.inherit_env = false;
        let env = script_env(&global(&[]), &cfg).unwrap();
        assert!(env.is_empty());
    }
}
