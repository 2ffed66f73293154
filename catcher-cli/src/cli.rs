//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// catcher -- tools for the syslog-catcher event service.
///
/// Use `catcher <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "catcher", version, about, long_about = None)]
pub struct Cli {
    /// Path to the catcher.toml configuration file.
    #[arg(short, long, default_value = "catcher.toml", global = true)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Subscribe to the daemon's event stream and print events.
    Subscribe(SubscribeArgs),

    /// Send sample device syslog lines over UDP.
    Mock(MockArgs),

    /// Parse syslog lines offline with the configured templates.
    Parse(ParseArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- subscribe ----

/// Open a subscription on the stream server.
#[derive(Args, Debug)]
pub struct SubscribeArgs {
    /// Stream server address.
    #[arg(short, long, default_value = "127.0.0.1:61614")]
    pub target: String,

    /// Client name (prefix of the subscription id).
    #[arg(short, long, default_value = "catcher-cli")]
    pub name: String,

    /// Event kinds to receive (port_up, port_down, port_loop_detect).
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub events: Vec<String>,

    /// CIDR networks to receive events from (empty = all hosts).
    #[arg(long, value_delimiter = ',')]
    pub nets: Vec<String>,

    /// Seconds between received-count summaries.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub summary_secs: u64,
}

// ---- mock ----

/// Generate sample device traffic.
#[derive(Args, Debug)]
pub struct MockArgs {
    /// Syslog UDP address of the daemon.
    #[arg(short, long, default_value = "127.0.0.1:51514")]
    pub target: String,

    /// Delay between datagrams in milliseconds.
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: u64,

    /// Stop after this many datagrams (default: run until interrupted).
    #[arg(long)]
    pub count: Option<u64>,
}

// ---- parse ----

/// Parse lines from a file or stdin.
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Input file (default: stdin).
    pub file: Option<PathBuf>,
}

// ---- config ----

/// Manage catcher configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, syslog, broker, stream, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
