use anyhow::Context as _;
use std::path::Path;

use slapper_core::runner::{RunConfig, Runner};

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output::{self, RunHeader};
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    crate::logging::init(args.output, args.log_file.as_deref()).map_err(RunError::InvalidInput)?;

    let text = read_targets(&args.targets)
        .await
        .map_err(RunError::InvalidInput)?;
    let targets = slapper_core::parse_targets(&text, args.base64body)
        .with_context(|| format!("invalid targets file: {}", args.targets.display()))
        .map_err(RunError::InvalidInput)?;

    let cfg = run_config(&args);
    let runner =
        Runner::new(cfg, &targets).map_err(|err| RunError::from_core(err, "invalid run config"))?;

    let out = output::formatter(args.output, args.duration);
    out.print_header(&RunHeader::new(args.targets.clone(), &runner));

    let runner = match out.progress() {
        Some(progress) => runner.with_progress(progress),
        None => runner,
    };

    let cancel = runner.cancel_token();
    let ui = out.attach(&runner);

    let signal = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        tracing::warn!(error = %err, "failed to listen for ctrl-c");
                        return;
                    }
                    tracing::info!("interrupted, draining workers");
                    cancel.cancel();
                }
            }
        })
    };

    let res = runner.run().await;
    cancel.cancel();
    let _ = signal.await;

    if let Some(ui) = ui {
        ui.await
            .context("terminal ui task failed")
            .and_then(|r| r.context("terminal ui failed"))
            .map_err(RunError::RuntimeError)?;
    }

    let summary = res.map_err(|err| RunError::from_core(err, "run failed"))?;
    out.print_summary(&summary).map_err(RunError::RuntimeError)?;

    Ok(ExitCode::Success)
}

async fn read_targets(path: &Path) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read targets file: {}", path.display()))
}

fn run_config(args: &RunArgs) -> RunConfig {
    RunConfig {
        workers: args.workers,
        timeout: args.timeout,
        rate: args.rate,
        min_y: args.min_y,
        max_y: args.max_y,
        headers: args.headers.clone(),
        duration: args.duration,
        ..RunConfig::default()
    }
}
