//! Offline commands: evaluate a script and show what it describes.

use tabled::Tabled;

use raven_config::Config;
use raven_core::{DisplayGraph, Participant, StatusBoard, Topology, inspect, project};

use crate::cli::{GlobalOpts, InspectArgs, ScriptArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct GraphNodeRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Level")]
    level: i64,
    #[tabled(rename = "Shape")]
    shape: String,
}

#[derive(Tabled)]
struct GraphEdgeRow {
    #[tabled(rename = "Edge")]
    id: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "To")]
    to: String,
}

fn graph_detail(graph: &DisplayGraph) -> String {
    let nodes: Vec<GraphNodeRow> = graph
        .nodes
        .iter()
        .map(|n| GraphNodeRow {
            id: n.id.clone(),
            kind: n.kind.to_string(),
            level: n.level,
            shape: n.shape.clone(),
        })
        .collect();
    let edges: Vec<GraphEdgeRow> = graph
        .edges
        .iter()
        .map(|e| GraphEdgeRow {
            id: e.id.clone(),
            from: e.from.clone(),
            to: e.to.clone(),
        })
        .collect();
    format!(
        "{}\n{}",
        output::render_table(&nodes),
        output::render_table(&edges)
    )
}

fn entity_names(topology: &Topology) -> String {
    topology
        .participants()
        .map(|p| p.name().to_owned())
        .chain(topology.links.iter().map(|l| l.name.clone()))
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Handlers ─────────────────────────────────────────────────────────

pub async fn model(args: ScriptArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let topology = util::evaluate_script(&args.script, global, cfg).await?;
    let out = output::render_single(global.output, &topology, ToString::to_string, entity_names)?;
    output::print_output(out.trim_end(), global.quiet);
    Ok(())
}

pub async fn graph(args: ScriptArgs, global: &GlobalOpts, cfg: &Config) -> Result<(), CliError> {
    let topology = util::evaluate_script(&args.script, global, cfg).await?;
    let graph = project(&topology, &cfg.projection_style());
    let out = output::render_single(global.output, &graph, graph_detail, |g| {
        g.nodes
            .iter()
            .map(|n| n.id.clone())
            .collect::<Vec<_>>()
            .join("\n")
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn inspect_entity(
    args: InspectArgs,
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<(), CliError> {
    let topology = util::evaluate_script(&args.script.script, global, cfg).await?;
    let board = StatusBoard::new(topology.name.clone());

    if args.live {
        let client = util::lifecycle_client(global, cfg)?;
        board.replace(client.status(&topology.name).await?);
    }

    let doc = inspect(&topology, &board, &args.entity).ok_or_else(|| CliError::EntityNotFound {
        name: args.entity.clone(),
        script: args.script.script.display().to_string(),
    })?;

    let out = output::render_single(
        global.output,
        &doc,
        |d| {
            d.as_object().map_or_else(String::new, |fields| {
                fields
                    .iter()
                    .map(|(k, v)| match v {
                        serde_json::Value::String(s) => format!("{k}: {s}"),
                        other => format!("{k}: {other}"),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            })
        },
        |d| {
            let status = &d["status"];
            status
                .as_str()
                .or_else(|| status["State"].as_str())
                .unwrap_or(raven_core::status::UNKNOWN)
                .to_owned()
        },
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
