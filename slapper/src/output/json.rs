use serde::Serialize;
use std::io::Write as _;
use std::sync::Arc;

use slapper_core::runner::{OutcomeTotals, ProgressUpdate, RunSummary};

use super::{OutputFormatter, RunHeader};

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _header: &RunHeader) {}

    fn progress(&self) -> Option<slapper_core::runner::ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        let line = build_summary_line(summary);
        emit_json_line(&line);
        Ok(())
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(crate) struct JsonOutcomes {
    pub success: u64,
    pub http_error: u64,
    pub transport_error: u64,
    pub timeout: u64,
}

impl From<&OutcomeTotals> for JsonOutcomes {
    fn from(t: &OutcomeTotals) -> Self {
        Self {
            success: t.success,
            http_error: t.http_error,
            transport_error: t.transport_error,
            timeout: t.timeout,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_secs: f64,
    pub interval_secs: f64,
    pub target_rate: u64,

    pub requests_per_sec: f64,
    pub error_rate: f64,
    pub total_requests: u64,
    pub outcomes: JsonOutcomes,

    pub latency_p50_ms: Option<f64>,
    pub latency_p90_ms: Option<f64>,
    pub latency_p99_ms: Option<f64>,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_secs: u.elapsed.as_secs_f64(),
        interval_secs: u.interval.as_secs_f64(),
        target_rate: u.target_rate,

        requests_per_sec: u.rps_now,
        error_rate: u.error_rate_now,
        total_requests: u.totals.total(),
        outcomes: JsonOutcomes::from(&u.totals),

        latency_p50_ms: u.latency_now.p50_ms,
        latency_p90_ms: u.latency_now.p90_ms,
        latency_p99_ms: u.latency_now.p99_ms,
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
    pub mean: f64,
    pub stdev: f64,
    pub max: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonStatusClasses {
    #[serde(rename = "2xx")]
    pub s2xx: u64,
    #[serde(rename = "3xx")]
    pub s3xx: u64,
    #[serde(rename = "4xx")]
    pub s4xx: u64,
    #[serde(rename = "5xx")]
    pub s5xx: u64,
    pub other: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub outcomes: JsonOutcomes,
    pub status: JsonStatusClasses,
    pub rps: f64,
    pub req_per_sec_avg: f64,
    pub req_per_sec_stdev: f64,
    pub req_per_sec_max: f64,
    pub error_rate: f64,
    /// Milliseconds.
    pub latency: Option<JsonLatencySummary>,
}

fn build_summary_line(summary: &RunSummary) -> JsonSummaryLine {
    let s = &summary.statuses;
    JsonSummaryLine {
        kind: "summary",
        elapsed_secs: summary.elapsed.as_secs_f64(),
        requests_total: summary.totals.total(),
        failed_requests_total: summary.totals.failed(),
        outcomes: JsonOutcomes::from(&summary.totals),
        status: JsonStatusClasses {
            s2xx: s.s2xx,
            s3xx: s.s3xx,
            s4xx: s.s4xx,
            s5xx: s.s5xx,
            other: s.other,
        },
        rps: summary.rps,
        req_per_sec_avg: summary.req_per_sec_avg,
        req_per_sec_stdev: summary.req_per_sec_stdev,
        req_per_sec_max: summary.req_per_sec_max,
        error_rate: summary.error_rate,
        latency: summary.latency.as_ref().map(|l| JsonLatencySummary {
            p50: l.p50_ms,
            p90: l.p90_ms,
            p99: l.p99_ms,
            mean: l.mean_ms,
            stdev: l.stdev_ms,
            max: l.max_ms,
        }),
    }
}

fn emit_json_line<T: Serialize>(value: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, value).is_ok() {
        let _ = out.write_all(b"\n");
        let _ = out.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slapper_core::runner::{StatusClasses, WindowLatency};

    use super::*;

    fn totals() -> OutcomeTotals {
        OutcomeTotals {
            success: 8,
            http_error: 1,
            transport_error: 0,
            timeout: 1,
        }
    }

    #[test]
    fn progress_line_shape() {
        let line = build_progress_line(&ProgressUpdate {
            tick: 3,
            elapsed: Duration::from_secs(3),
            interval: Duration::from_secs(1),
            target_rate: 10,
            rps_now: 10.0,
            error_rate_now: 0.2,
            totals: totals(),
            latency_now: WindowLatency {
                p50_ms: Some(1.5),
                p90_ms: None,
                p99_ms: None,
            },
        });

        let v = serde_json::to_value(&line).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(v["kind"], "progress");
        assert_eq!(v["tick"], 3);
        assert_eq!(v["target_rate"], 10);
        assert_eq!(v["total_requests"], 10);
        assert_eq!(v["outcomes"]["timeout"], 1);
        assert_eq!(v["latency_p50_ms"], 1.5);
        assert!(v["latency_p90_ms"].is_null());
    }

    #[test]
    fn summary_line_shape() {
        let line = build_summary_line(&RunSummary {
            elapsed: Duration::from_secs(1),
            totals: totals(),
            statuses: StatusClasses {
                s2xx: 8,
                s5xx: 1,
                ..StatusClasses::default()
            },
            rps: 10.0,
            req_per_sec_avg: 10.0,
            req_per_sec_stdev: 0.0,
            req_per_sec_max: 10.0,
            latency: None,
            error_rate: 0.2,
        });

        let v = serde_json::to_value(&line).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(v["kind"], "summary");
        assert_eq!(v["requests_total"], 10);
        assert_eq!(v["failed_requests_total"], 2);
        assert_eq!(v["status"]["2xx"], 8);
        assert_eq!(v["status"]["5xx"], 1);
        assert!(v["latency"].is_null());
    }
}
