use std::sync::Arc;

pub(crate) mod format;
mod progress;
mod summary;

use format::{format_duration, format_ms_opt, format_pct, format_rate};
use progress::HumanProgress;

pub(crate) use summary::render;

use super::{OutputFormatter, RunHeader};

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new(duration: Option<std::time::Duration>) -> Self {
        Self {
            progress: Arc::new(HumanProgress::new(duration)),
        }
    }
}

pub(crate) fn render_header(header: &RunHeader) -> String {
    let duration = header
        .duration
        .map_or_else(|| "until interrupted".to_string(), format_duration);
    format!(
        "targets: {} ({})\nworkers={} rate={}/s timeout={} duration={}\n",
        header.targets_path.display(),
        header.targets,
        header.workers,
        header.rate,
        format_duration(header.timeout),
        duration
    )
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, header: &RunHeader) {
        println!("{}", render_header(header));
    }

    fn progress(&self) -> Option<slapper_core::runner::ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let message = format!(
                "elapsed={} rps={}/{} ok={} errors={} ({} now) p50={} p99={}",
                format_duration(u.elapsed),
                format_rate(u.rps_now),
                u.target_rate,
                u.totals.success,
                u.totals.failed(),
                format_pct(u.error_rate_now),
                format_ms_opt(u.latency_now.p50_ms),
                format_ms_opt(u.latency_now.p99_ms),
            );
            progress.update(u.elapsed, message);
        }))
    }

    fn print_summary(&self, summary: &slapper_core::runner::RunSummary) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(summary));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    #[test]
    fn header_mentions_run_shape() {
        let text = render_header(&RunHeader {
            targets_path: PathBuf::from("targets.txt"),
            targets: 3,
            workers: 8,
            rate: 50,
            timeout: Duration::from_secs(30),
            duration: None,
        });
        assert!(text.contains("targets: targets.txt (3)"), "{text}");
        assert!(text.contains("workers=8 rate=50/s timeout=30s"), "{text}");
        assert!(text.contains("duration=until interrupted"), "{text}");
    }
}
