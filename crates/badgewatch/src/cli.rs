//! Clap derive structures for the `badgewatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Also compiled by `build.rs` for man pages, so it depends on clap only.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// badgewatch -- live presence for BLE badges
#[derive(Debug, Parser)]
#[command(
    name = "badgewatch",
    version,
    about = "Track BLE badge advertisements and serve live presence",
    long_about = "Decodes vendor advertisements from BLE badges, keeps a registry of\n\
        every badge seen, and reports which are online.\n\n\
        Frames arrive as JSON lines from an external scanning service\n\
        (stdin, a file, or TCP). `serve` exposes the live snapshot over\n\
        HTTP and WebSocket.",
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
    /// Config file (default: platform config dir)
    #[arg(long, env = "BADGEWATCH_CONFIG", global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Active payload layout (overrides config)
    #[arg(long, short = 'L', global = true)]
    pub layout: Option<LayoutArg>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BADGEWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
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

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LayoutArg {
    /// app id, u16 device id, status
    A,
    /// app id, u32 device id, event, posture
    B,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Stdin,
    File,
    Tcp,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest frames and serve the live snapshot over HTTP/WebSocket
    #[command(alias = "s")]
    Serve(ServeArgs),

    /// Decode a single manufacturer payload
    #[command(alias = "d")]
    Decode(DecodeArgs),

    /// Ingest a finite frame file and print the resulting snapshot
    #[command(alias = "snap")]
    Snapshot(SnapshotArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address for the web server
    #[arg(long, short = 'b', value_name = "ADDR")]
    pub bind: Option<String>,

    /// Where scanner frames come from
    #[arg(long)]
    pub source: Option<SourceArg>,

    /// Frame file (with --source file)
    #[arg(long, value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Scanner service `host:port` (with --source tcp)
    #[arg(long, value_name = "HOST:PORT")]
    pub connect: Option<String>,

    /// Seconds without a frame before a badge is offline
    #[arg(long, value_name = "SECS")]
    pub offline_timeout: Option<f64>,

    /// WebSocket push interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub push_interval: Option<u64>,

    /// Ingestion queue capacity
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DECODE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Hex-encoded manufacturer payload (or raw advertising data with --adv)
    pub hex: String,

    /// Treat the input as raw advertising data (length-type-value records)
    #[arg(long)]
    pub adv: bool,

    /// Advertised local name; enables the name-prefix check
    #[arg(long)]
    pub name: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SNAPSHOT
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SnapshotArgs {
    /// JSON-lines frame file, or `-` for stdin
    pub file: PathBuf,

    /// Seconds without a frame before a badge is offline
    #[arg(long, value_name = "SECS")]
    pub offline_timeout: Option<f64>,

    /// Only list badges that are online
    #[arg(long)]
    pub online: bool,
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
    /// Write a config file with the built-in defaults
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Display the resolved configuration (defaults + file + environment)
    Show,

    /// Print the config file location
    Path,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
