use std::fmt::Write as _;

use slapper_core::runner::RunSummary;

use super::format::*;

pub(crate) fn render(summary: &RunSummary) -> String {
    let mut out = String::new();
    let t = &summary.totals;

    out.push_str("summary\n");
    writeln!(
        &mut out,
        "  requests: {} in {} (failed {})",
        t.total(),
        format_duration(summary.elapsed),
        t.failed()
    )
    .ok();
    writeln!(
        &mut out,
        "  outcomes: success={} http_error={} transport_error={} timeout={}",
        t.success, t.http_error, t.transport_error, t.timeout
    )
    .ok();

    let s = &summary.statuses;
    writeln!(
        &mut out,
        "  status: 2xx={} 3xx={} 4xx={} 5xx={} other={}",
        s.s2xx, s.s3xx, s.s4xx, s.s5xx, s.other
    )
    .ok();

    writeln!(
        &mut out,
        "  rates: rps={} (per second: avg={} stdev={} max={})",
        format_rate(summary.rps),
        format_rate(summary.req_per_sec_avg),
        format_rate(summary.req_per_sec_stdev),
        format_rate(summary.req_per_sec_max)
    )
    .ok();

    match &summary.latency {
        Some(l) => {
            writeln!(
                &mut out,
                "  latency = p50={} p90={} p99={} mean={} stdev={} max={}",
                format_ms(l.p50_ms),
                format_ms(l.p90_ms),
                format_ms(l.p99_ms),
                format_ms(l.mean_ms),
                format_ms(l.stdev_ms),
                format_ms(l.max_ms)
            )
            .ok();
        }
        None => out.push_str("  latency: n/a\n"),
    }

    writeln!(&mut out, "  error_rate: {}", format_pct(summary.error_rate)).ok();
    out
}
