use std::time::Duration;

use super::stats::{OutcomeTotals, WindowLatency};

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based) for progress emissions.
    pub tick: u64,
    pub elapsed: Duration,
    /// Length of the interval the `*_now` fields describe.
    pub interval: Duration,
    /// Governor rate at the time of the tick.
    pub target_rate: u64,
    /// Requests/sec completed during the last interval.
    pub rps_now: f64,
    /// Failed / completed during the last interval (0..=1).
    pub error_rate_now: f64,
    pub totals: OutcomeTotals,
    pub latency_now: WindowLatency,
}

pub type ProgressFn = std::sync::Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;
