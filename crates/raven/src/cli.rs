//! Clap derive structures for the `rvn` CLI.
//!
//! Defines the command tree, global flags, and shared argument types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// rvn -- model, launch and watch raven network testbeds
#[derive(Debug, Parser)]
#[command(
    name = "rvn",
    version,
    about = "Model, launch and watch raven network testbeds",
    long_about = "Evaluates topology scripts into canonical topology documents,\n\
        projects them into display graphs, and drives the raven backend\n\
        through push, launch, configure, destroy and status.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend URL (overrides config)
    #[arg(long, short = 'b', env = "RAVEN_BACKEND_URL", global = true)]
    pub backend: Option<String>,

    /// Backend request timeout in seconds (overrides config)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "RAVEN_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Extra `env` binding for scripts (repeatable)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE", global = true)]
    pub env: Vec<String>,

    /// Do not expose the process environment to scripts
    #[arg(long, global = true)]
    pub no_inherit_env: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate a script and print the canonical topology
    #[command(alias = "eval")]
    Model(ScriptArgs),

    /// Evaluate a script and print its display graph
    Graph(ScriptArgs),

    /// Show one entity of a script's topology, joined with its status
    Inspect(InspectArgs),

    /// Evaluate a script and submit the topology to the backend
    Push(ScriptArgs),

    /// Evaluate a script and ask the backend to export its mounts
    Mount(ScriptArgs),

    /// Launch a pushed topology
    Launch(TopoArgs),

    /// Configure every host of a launched topology
    Configure(TopoArgs),

    /// Tear a topology down
    Destroy(TopoArgs),

    /// Show backend status for a topology
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Poll status continuously until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Shared Arguments ─────────────────────────────────────────────────

/// A topology script on disk.
#[derive(Debug, Args)]
pub struct ScriptArgs {
    /// Path to the topology script
    #[arg(value_name = "SCRIPT")]
    pub script: PathBuf,
}

/// A topology already known to the backend.
#[derive(Debug, Args)]
pub struct TopoArgs {
    /// Topology name
    #[arg(value_name = "TOPO")]
    pub topology: String,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    #[command(flatten)]
    pub script: ScriptArgs,

    /// Node, switch or link name
    #[arg(value_name = "ENTITY")]
    pub entity: String,

    /// Fetch current status from the backend before joining
    #[arg(long)]
    pub live: bool,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub topo: TopoArgs,

    /// Print the backend's pre-rendered status fragment instead
    #[arg(long)]
    pub fragment: bool,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub topo: TopoArgs,

    /// Poll interval in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    pub interval: Option<u64>,

    /// Stop after this many refreshed snapshots
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display the effective configuration
    Show,

    /// Print the config file location
    Path,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
