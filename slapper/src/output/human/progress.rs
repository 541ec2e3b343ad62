use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Single progress line on stderr: a bar when the run has a fixed duration, a spinner
/// otherwise. Created lazily on the first update.
pub(crate) struct HumanProgress {
    total: Option<Duration>,
    bar: Mutex<Option<ProgressBar>>,
}

impl HumanProgress {
    pub(crate) fn new(total: Option<Duration>) -> Self {
        Self {
            total,
            bar: Mutex::new(None),
        }
    }

    pub(crate) fn update(&self, elapsed: Duration, message: String) {
        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let pb = bar.get_or_insert_with(|| self.create_bar());
        pb.set_message(message);

        match self.total {
            Some(total) => {
                let total_ms = total.as_millis() as u64;
                let elapsed_ms = elapsed.as_millis() as u64;
                pb.set_position(elapsed_ms.min(total_ms));
            }
            None => pb.tick(),
        }
    }

    pub(crate) fn finish(&self) {
        let mut bar = self
            .bar
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pb) = bar.take() {
            pb.finish_and_clear();
        }
    }

    fn create_bar(&self) -> ProgressBar {
        let pb = match self.total {
            Some(total) => {
                let pb = ProgressBar::new(total.as_millis() as u64);
                pb.set_style(bar_style());
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(spinner_style());
                pb.enable_steady_tick(Duration::from_millis(120));
                pb
            }
        };
        pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(5));
        pb.set_prefix("slapper");
        pb
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} [ {bar:20.cyan/blue} ] {percent:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█░")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{prefix} {spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
