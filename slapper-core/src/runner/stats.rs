use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use hdrhistogram::Histogram;
use parking_lot::Mutex;

use super::sample::{Outcome, Sample};

/// Highest latency tracked with full precision (one hour, in microseconds). Longer values
/// are saturated.
const HIST_MAX_US: u64 = 3_600_000_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeTotals {
    pub success: u64,
    pub http_error: u64,
    pub transport_error: u64,
    pub timeout: u64,
}

impl OutcomeTotals {
    pub fn total(&self) -> u64 {
        self.success + self.failed()
    }

    pub fn failed(&self) -> u64 {
        self.http_error + self.transport_error + self.timeout
    }

    pub fn get(&self, outcome: Outcome) -> u64 {
        match outcome {
            Outcome::Success => self.success,
            Outcome::HttpError => self.http_error,
            Outcome::TransportError => self.transport_error,
            Outcome::Timeout => self.timeout,
        }
    }

    /// Failed / total, in `0..=1`. Zero when nothing completed.
    pub fn error_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.failed() as f64 / total as f64
        }
    }

    pub fn saturating_sub(&self, earlier: &Self) -> Self {
        Self {
            success: self.success.saturating_sub(earlier.success),
            http_error: self.http_error.saturating_sub(earlier.http_error),
            transport_error: self.transport_error.saturating_sub(earlier.transport_error),
            timeout: self.timeout.saturating_sub(earlier.timeout),
        }
    }
}

/// Responses received, grouped by status class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusClasses {
    pub s2xx: u64,
    pub s3xx: u64,
    pub s4xx: u64,
    pub s5xx: u64,
    pub other: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub stdev_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Percentiles over the samples recorded since the previous call to
/// [`RunStats::take_window_latency`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowLatency {
    pub p50_ms: Option<f64>,
    pub p90_ms: Option<f64>,
    pub p99_ms: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub totals: OutcomeTotals,
    pub statuses: StatusClasses,
    /// Completed requests per second over the whole run.
    pub rps: f64,
    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,
    pub latency: Option<LatencySummary>,
    pub error_rate: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct RpsAgg {
    count: u64,
    mean: f64,
    m2: f64,
    max: f64,
}

impl RpsAgg {
    fn record(&mut self, sample: f64) {
        if !sample.is_finite() {
            return;
        }

        self.count = self.count.saturating_add(1);
        let delta = sample - self.mean;
        self.mean += delta / (self.count as f64);
        let delta2 = sample - self.mean;
        self.m2 += delta * delta2;
        self.max = self.max.max(sample);
    }

    /// `(avg, stdev, max)`
    fn summary(&self) -> (f64, f64, f64) {
        if self.count == 0 {
            return (0.0, 0.0, 0.0);
        }

        let stdev = if self.count >= 2 {
            (self.m2 / ((self.count - 1) as f64)).sqrt()
        } else {
            0.0
        };
        (self.mean, stdev, self.max)
    }
}

/// Aggregate counters for a run, updated by every worker.
#[derive(Debug)]
pub struct RunStats {
    success: AtomicU64,
    http_error: AtomicU64,
    transport_error: AtomicU64,
    timeout: AtomicU64,

    status_2xx: AtomicU64,
    status_3xx: AtomicU64,
    status_4xx: AtomicU64,
    status_5xx: AtomicU64,
    status_other: AtomicU64,

    latency_us: Mutex<Histogram<u64>>,
    latency_us_window: Mutex<Histogram<u64>>,
    rps_samples: Mutex<RpsAgg>,
}

impl Default for RunStats {
    fn default() -> Self {
        fn new_hist() -> Histogram<u64> {
            Histogram::<u64>::new_with_bounds(1, HIST_MAX_US, 3)
                .unwrap_or_else(|err| panic!("failed to init histogram: {err}"))
        }

        Self {
            success: AtomicU64::new(0),
            http_error: AtomicU64::new(0),
            transport_error: AtomicU64::new(0),
            timeout: AtomicU64::new(0),
            status_2xx: AtomicU64::new(0),
            status_3xx: AtomicU64::new(0),
            status_4xx: AtomicU64::new(0),
            status_5xx: AtomicU64::new(0),
            status_other: AtomicU64::new(0),
            latency_us: Mutex::new(new_hist()),
            latency_us_window: Mutex::new(new_hist()),
            rps_samples: Mutex::new(RpsAgg::default()),
        }
    }
}

impl RunStats {
    pub fn record(&self, sample: &Sample) {
        let counter = match sample.outcome {
            Outcome::Success => &self.success,
            Outcome::HttpError => &self.http_error,
            Outcome::TransportError => &self.transport_error,
            Outcome::Timeout => &self.timeout,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        if let Some(status) = sample.status {
            let class = match status {
                200..=299 => &self.status_2xx,
                300..=399 => &self.status_3xx,
                400..=499 => &self.status_4xx,
                500..=599 => &self.status_5xx,
                _ => &self.status_other,
            };
            class.fetch_add(1, Ordering::Relaxed);
        }

        self.record_latency(sample.latency);
    }

    fn record_latency(&self, latency: Duration) {
        let us = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.latency_us.lock().saturating_record(us);
        self.latency_us_window.lock().saturating_record(us);
    }

    pub fn totals(&self) -> OutcomeTotals {
        OutcomeTotals {
            success: self.success.load(Ordering::Relaxed),
            http_error: self.http_error.load(Ordering::Relaxed),
            transport_error: self.transport_error.load(Ordering::Relaxed),
            timeout: self.timeout.load(Ordering::Relaxed),
        }
    }

    pub fn statuses(&self) -> StatusClasses {
        StatusClasses {
            s2xx: self.status_2xx.load(Ordering::Relaxed),
            s3xx: self.status_3xx.load(Ordering::Relaxed),
            s4xx: self.status_4xx.load(Ordering::Relaxed),
            s5xx: self.status_5xx.load(Ordering::Relaxed),
            other: self.status_other.load(Ordering::Relaxed),
        }
    }

    pub fn requests_total(&self) -> u64 {
        self.totals().total()
    }

    pub fn record_rps_sample(&self, rps_now: f64) {
        self.rps_samples.lock().record(rps_now);
    }

    pub fn take_window_latency(&self) -> WindowLatency {
        let mut h = self.latency_us_window.lock();

        #[allow(clippy::len_zero)]
        let out = if h.len() == 0 {
            WindowLatency::default()
        } else {
            WindowLatency {
                p50_ms: Some(h.value_at_quantile(0.50) as f64 / 1000.0),
                p90_ms: Some(h.value_at_quantile(0.90) as f64 / 1000.0),
                p99_ms: Some(h.value_at_quantile(0.99) as f64 / 1000.0),
            }
        };

        h.reset();
        out
    }

    pub fn latency_summary(&self) -> Option<LatencySummary> {
        let h = self.latency_us.lock();

        #[allow(clippy::len_zero)]
        if h.len() == 0 {
            return None;
        }

        Some(LatencySummary {
            mean_ms: h.mean() / 1000.0,
            stdev_ms: h.stdev() / 1000.0,
            p50_ms: h.value_at_quantile(0.50) as f64 / 1000.0,
            p90_ms: h.value_at_quantile(0.90) as f64 / 1000.0,
            p99_ms: h.value_at_quantile(0.99) as f64 / 1000.0,
            max_ms: h.max() as f64 / 1000.0,
        })
    }

    pub fn summarize(&self, elapsed: Duration) -> RunSummary {
        let secs = elapsed.as_secs_f64().max(1e-9);
        let totals = self.totals();
        let (req_per_sec_avg, req_per_sec_stdev, req_per_sec_max) =
            self.rps_samples.lock().summary();

        RunSummary {
            elapsed,
            totals,
            statuses: self.statuses(),
            rps: totals.total() as f64 / secs,
            req_per_sec_avg,
            req_per_sec_stdev,
            req_per_sec_max,
            latency: self.latency_summary(),
            error_rate: totals.error_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ms: u64, outcome: Outcome, status: Option<u16>) -> Sample {
        Sample::new(Duration::from_millis(ms), outcome, status)
    }

    #[test]
    fn counts_outcomes_and_status_classes() {
        let stats = RunStats::default();
        stats.record(&sample(1, Outcome::Success, Some(200)));
        stats.record(&sample(1, Outcome::Success, Some(301)));
        stats.record(&sample(1, Outcome::HttpError, Some(404)));
        stats.record(&sample(1, Outcome::HttpError, Some(503)));
        stats.record(&sample(1, Outcome::TransportError, None));
        stats.record(&sample(1, Outcome::Timeout, None));

        let totals = stats.totals();
        assert_eq!(totals.success, 2);
        assert_eq!(totals.http_error, 2);
        assert_eq!(totals.transport_error, 1);
        assert_eq!(totals.timeout, 1);
        assert_eq!(totals.total(), 6);
        assert_eq!(totals.failed(), 4);

        let statuses = stats.statuses();
        assert_eq!(
            statuses,
            StatusClasses {
                s2xx: 1,
                s3xx: 1,
                s4xx: 1,
                s5xx: 1,
                other: 0,
            }
        );
    }

    #[test]
    fn window_latency_resets_after_take() {
        let stats = RunStats::default();
        for ms in [10, 20, 30, 40] {
            stats.record(&sample(ms, Outcome::Success, Some(200)));
        }

        let window = stats.take_window_latency();
        let p50 = window.p50_ms.unwrap_or_else(|| panic!("missing p50"));
        assert!((19.0..=21.0).contains(&p50), "p50={p50}");
        assert_eq!(stats.take_window_latency(), WindowLatency::default());

        // The whole-run histogram is unaffected.
        assert!(stats.latency_summary().is_some());
    }

    #[test]
    fn summary_of_empty_run() {
        let stats = RunStats::default();
        let summary = stats.summarize(Duration::from_secs(2));
        assert_eq!(summary.totals.total(), 0);
        assert!(summary.latency.is_none());
        assert_eq!(summary.error_rate, 0.0);
        assert_eq!(summary.rps, 0.0);
    }

    #[test]
    fn summary_rates() {
        let stats = RunStats::default();
        for _ in 0..30 {
            stats.record(&sample(5, Outcome::Success, Some(200)));
        }
        for _ in 0..10 {
            stats.record(&sample(5, Outcome::Timeout, None));
        }
        stats.record_rps_sample(10.0);
        stats.record_rps_sample(30.0);

        let summary = stats.summarize(Duration::from_secs(2));
        assert_eq!(summary.rps, 20.0);
        assert_eq!(summary.error_rate, 0.25);
        assert_eq!(summary.req_per_sec_avg, 20.0);
        assert_eq!(summary.req_per_sec_max, 30.0);
        assert!(summary.req_per_sec_stdev > 0.0);

        let latency = summary.latency.unwrap_or_else(|| panic!("missing latency"));
        assert!((4.9..=5.1).contains(&latency.p99_ms), "{latency:?}");
    }

    #[test]
    fn very_long_latency_is_saturated_not_dropped() {
        let stats = RunStats::default();
        stats.record(&sample(10 * 3_600_000, Outcome::Timeout, None));
        let latency = stats
            .latency_summary()
            .unwrap_or_else(|| panic!("missing latency"));
        assert!(latency.max_ms >= 3_599_000.0, "{latency:?}");
    }

    #[test]
    fn totals_delta() {
        let later = OutcomeTotals {
            success: 10,
            http_error: 4,
            transport_error: 1,
            timeout: 0,
        };
        let earlier = OutcomeTotals {
            success: 7,
            http_error: 4,
            ..OutcomeTotals::default()
        };
        let delta = later.saturating_sub(&earlier);
        assert_eq!(delta.total(), 4);
        assert_eq!(delta.get(Outcome::TransportError), 1);
    }
}
