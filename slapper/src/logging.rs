use std::path::Path;
use std::sync::Mutex;

use anyhow::Context as _;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::OutputFormat;

/// Default filter when `RUST_LOG` is unset.
fn default_directive(output: OutputFormat) -> &'static str {
    match output {
        OutputFormat::Tui => "warn",
        OutputFormat::HumanReadable | OutputFormat::Json => "info",
    }
}

/// Install the global subscriber.
///
/// Logs go to `log_file` when given, otherwise to stderr. The terminal chart owns the
/// screen, so without a file nothing is logged in `tui` mode.
pub(crate) fn init(output: OutputFormat, log_file: Option<&Path>) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(output)));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file: {}", path.display()))?;

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
                .try_init()
                .context("failed to install log subscriber")?;
        }
        None if output == OutputFormat::Tui => {}
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .context("failed to install log subscriber")?;
        }
    }

    Ok(())
}
