use std::path::PathBuf;
use std::time::Duration;

use slapper_core::runner::{ProgressFn, RunSummary, Runner};
use tokio::task::JoinHandle;

use crate::cli::OutputFormat;

mod human;
mod json;
mod tui;

/// What is about to run, for front-ends that print it.
#[derive(Debug, Clone)]
pub(crate) struct RunHeader {
    pub targets_path: PathBuf,
    pub targets: usize,
    pub workers: u64,
    pub rate: u64,
    pub timeout: Duration,
    pub duration: Option<Duration>,
}

impl RunHeader {
    pub(crate) fn new(targets_path: PathBuf, runner: &Runner) -> Self {
        let cfg = runner.config();
        Self {
            targets_path,
            targets: runner.targets(),
            workers: cfg.workers,
            rate: cfg.rate,
            timeout: cfg.timeout,
            duration: cfg.duration,
        }
    }
}

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, header: &RunHeader);
    fn progress(&self) -> Option<ProgressFn>;

    /// Start a front-end that observes the run directly (chart feed, governor, stop token).
    /// The returned task must finish once the run's stop token is cancelled.
    fn attach(&self, _runner: &Runner) -> Option<JoinHandle<anyhow::Result<()>>> {
        None
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()>;
}

pub(crate) fn formatter(
    format: OutputFormat,
    duration: Option<Duration>,
) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Tui => Box::new(tui::TuiOutput::new()),
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new(duration)),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
