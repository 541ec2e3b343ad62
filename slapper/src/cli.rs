use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use slapper_core::runner::{DEFAULT_RATE, DEFAULT_WORKERS};

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}': {err} (expected e.g. 10s, 250ms, 1m)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Live latency chart in the terminal.
    Tui,
    /// Progress spinner on stderr and a summary on stdout.
    #[value(name = "human")]
    HumanReadable,
    /// Emit JSON progress lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "slapper",
    author,
    version,
    about = "Simple HTTP load tester with a live latency chart",
    long_about = "slapper replays the requests described in a target file at a fixed aggregate rate, using a bounded pool of concurrent workers, and charts response latencies live.\n\nTarget file format:\n  <METHOD> <URL>\n  H <Header-Name>: <value>\n  $ <body>\n\nBlank lines separate targets; other lines are ignored.",
    after_help = "Examples:\n  slapper run --targets targets.txt --rate 100 --workers 16\n  slapper run --targets targets.txt --maxY 250ms -H 'Authorization: Bearer t'\n  slapper run --targets targets.txt --duration 30s --output json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test
    Run(RunArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Targets file
    #[arg(long)]
    pub targets: PathBuf,

    /// Number of workers (bounds requests in flight)
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: u64,

    /// Requests timeout (e.g. 30s, 500ms)
    #[arg(long, value_parser = parse_duration, default_value = "30s")]
    pub timeout: Duration,

    /// Requests per second, across all workers
    #[arg(long, default_value_t = DEFAULT_RATE)]
    pub rate: u64,

    /// Bodies in targets file are base64-encoded
    #[arg(long)]
    pub base64body: bool,

    /// Lower bound of the chart's latency axis
    #[arg(long = "minY", alias = "min-y", value_parser = parse_duration, default_value = "0ms")]
    pub min_y: Duration,

    /// Upper bound of the chart's latency axis
    #[arg(long = "maxY", alias = "max-y", value_parser = parse_duration, default_value = "100ms")]
    pub max_y: Duration,

    /// HTTP header 'key: value' set on all requests. Repeat for more than one header.
    #[arg(short = 'H', long = "header", value_name = "KEY: VALUE", action = ArgAction::Append)]
    pub headers: Vec<String>,

    /// Stop after this long (otherwise run until interrupted)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Tui)]
    pub output: OutputFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}
