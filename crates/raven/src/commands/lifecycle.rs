//! Backend commands: push, mount, launch, configure, destroy, status, watch.

use std::sync::Arc;
use std::time::Duration;

use strum::IntoEnumIterator;
use tabled::Tabled;

use raven_config::Config;
use raven_core::{Category, LaunchReport, StatusMap, StatusOverlay};

use crate::cli::{GlobalOpts, OutputFormat, ScriptArgs, StatusArgs, TopoArgs, WatchArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

// ── Status table ─────────────────────────────────────────────────────

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Config")]
    config: String,
    #[tabled(rename = "IP")]
    ip: String,
}

/// (kind, name, state, config state, ip) for every entry, nodes first.
fn status_rows(map: &StatusMap) -> Vec<(&'static str, String, String, String, String)> {
    Category::iter()
        .flat_map(|category| {
            map.category(category).map(move |(name, value)| {
                let ip = value
                    .domain()
                    .map(|d| d.ip.clone())
                    .filter(|ip| !ip.is_empty())
                    .unwrap_or_else(|| "-".into());
                (
                    category.into(),
                    name.to_owned(),
                    value.state().to_owned(),
                    value.config_state().unwrap_or("-").to_owned(),
                    ip,
                )
            })
        })
        .collect()
}

fn status_detail(map: &StatusMap, color: bool) -> String {
    let rows: Vec<StatusRow> = status_rows(map)
        .into_iter()
        .map(|(kind, name, state, config, ip)| StatusRow {
            kind,
            name,
            state: output::paint_state(&state, color),
            config: output::paint_state(&config, color),
            ip,
        })
        .collect();
    output::render_table(&rows)
}

fn status_names(map: &StatusMap) -> String {
    status_rows(map)
        .into_iter()
        .map(|(_, name, state, ..)| format!("{name}\t{state}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Print a backend reply body; structured formats wrap it with the topology.
fn print_reply(global: &GlobalOpts, topology: &str, reply: &str) -> Result<(), CliError> {
    let doc = serde_json::json!({ "topology": topology, "reply": reply.trim() });
    let out = output::render_single(global.output, &doc, |_| reply.trim().to_owned(), |_| {
        reply.trim().to_owned()
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn push(args: ScriptArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let topology = util::evaluate_script(&args.script, global, cfg).await?;
    let client = util::lifecycle_client(global, cfg)?;
    let reply = client.push(&topology).await?;
    print_reply(global, &topology.name, &reply)
}

pub async fn mount(args: ScriptArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let topology = util::evaluate_script(&args.script, global, cfg).await?;
    let client = util::lifecycle_client(global, cfg)?;
    let reply = client.mount(&topology).await?;
    print_reply(global, &topology.name, &reply)
}

pub async fn launch(args: TopoArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let client = util::lifecycle_client(global, cfg)?;
    match client.launch(&args.topology).await? {
        LaunchReport::Ok => print_reply(global, &args.topology, "ok"),
        LaunchReport::Errors(errors) => Err(CliError::LaunchFailed {
            topology: args.topology,
            count: errors.len(),
            details: errors.join("\n"),
        }),
    }
}

pub async fn configure(args: TopoArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let client = util::lifecycle_client(global, cfg)?;
    let reply = client.configure(&args.topology).await?;
    print_reply(global, &args.topology, &reply)
}

pub async fn destroy(args: TopoArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let prompt = format!("Destroy topology '{}' and all its hosts?", args.topology);
    if !util::confirm(&prompt, "destroy", global.yes)? {
        return Ok(());
    }
    let client = util::lifecycle_client(global, cfg)?;
    let reply = client.destroy(&args.topology).await?;
    print_reply(global, &args.topology, &reply)
}

pub async fn status(args: StatusArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let client = util::lifecycle_client(global, cfg)?;
    if args.fragment {
        let fragment = client.status_fragment(&args.topo.topology).await?;
        output::print_output(fragment.trim_end(), global.quiet);
        return Ok(());
    }

    let map = client.status(&args.topo.topology).await?;
    let color = output::should_color(global.color);
    let out = output::render_single(
        global.output,
        &map,
        |m| status_detail(m, color),
        status_names,
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Run the status overlay and re-render every refreshed snapshot until
/// Ctrl-C (or `--cycles`).
pub async fn watch(args: WatchArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let client = Arc::new(util::lifecycle_client(global, cfg)?);
    let mut overlay_cfg = cfg.overlay_config();
    if let Some(ms) = args.interval {
        overlay_cfg.poll_interval = Duration::from_millis(ms.max(1));
    }

    let overlay = StatusOverlay::spawn(client, &args.topo.topology, &overlay_cfg);
    let board = Arc::clone(overlay.board());
    let mut cycles = board.subscribe();
    let color = output::should_color(global.color);
    let mut shown = 0_u64;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = cycles.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = board.snapshot();
                let out = match global.output {
                    OutputFormat::Table => {
                        let stamp = snapshot
                            .fetched_at
                            .map(|t| t.format("%H:%M:%S").to_string())
                            .unwrap_or_default();
                        format!(
                            "{} (cycle {}, {stamp})\n{}",
                            snapshot.topology,
                            snapshot.cycle,
                            status_detail(&snapshot.map, color)
                        )
                    }
                    // one document per line keeps the stream parseable
                    OutputFormat::Json | OutputFormat::JsonCompact => {
                        output::render_json(&snapshot.map, true)?
                    }
                    OutputFormat::Yaml => format!("---\n{}", output::render_yaml(&snapshot.map)?),
                    OutputFormat::Plain => status_names(&snapshot.map),
                };
                output::print_output(&out, global.quiet);

                shown += 1;
                if args.cycles.is_some_and(|n| shown >= n) {
                    break;
                }
            }
        }
    }

    overlay.shutdown().await;
    Ok(())
}
