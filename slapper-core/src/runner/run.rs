use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use slapper_http::{HttpClient, HttpRequest};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::chart::{AxisBounds, ChartFeed};
use super::config::RunConfig;
use super::cursor::SharedCursor;
use super::error::{Error, Result};
use super::pacer::{Acquire, RateGovernor};
use super::progress::{ProgressFn, ProgressUpdate};
use super::request::prepare_requests;
use super::sample::{Outcome, Sample};
use super::stats::{RunStats, RunSummary};
use crate::TargetList;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

/// A configured run: validated settings, prepared requests and the state shared with
/// observers (chart feed, stats, governor).
///
/// Observers grab their handles before calling [`Runner::run`], which consumes the runner.
pub struct Runner {
    config: RunConfig,
    requests: Arc<[HttpRequest]>,
    client: Arc<HttpClient>,
    cancel: CancellationToken,
    governor: Arc<RateGovernor>,
    feed: Arc<ChartFeed>,
    stats: Arc<RunStats>,
    progress: Option<ProgressFn>,
}

impl Runner {
    pub fn new(config: RunConfig, targets: &TargetList) -> Result<Self> {
        config.validate()?;
        if targets.is_empty() {
            return Err(Error::NoTargets);
        }

        let requests = prepare_requests(targets, &config.extra_headers()?)?;
        let bounds = AxisBounds::new(config.min_y, config.max_y)?;
        let cancel = CancellationToken::new();
        let governor = RateGovernor::new(config.rate, cancel.clone())?;
        let max_idle = usize::try_from(config.workers).unwrap_or(usize::MAX);

        Ok(Self {
            requests,
            client: Arc::new(HttpClient::with_pool(Some(CONNECT_TIMEOUT), max_idle)),
            cancel,
            governor: Arc::new(governor),
            feed: Arc::new(ChartFeed::new(bounds, config.chart_capacity)),
            stats: Arc::new(RunStats::default()),
            progress: None,
            config,
        })
    }

    #[must_use]
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    #[must_use]
    pub fn with_client(mut self, client: HttpClient) -> Self {
        self.client = Arc::new(client);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Number of prepared targets.
    pub fn targets(&self) -> usize {
        self.requests.len()
    }

    /// Cancelling this token stops the run. Workers finish their in-flight request first.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn governor(&self) -> Arc<RateGovernor> {
        self.governor.clone()
    }

    pub fn feed(&self) -> Arc<ChartFeed> {
        self.feed.clone()
    }

    pub fn stats(&self) -> Arc<RunStats> {
        self.stats.clone()
    }

    /// Drive the worker pool until cancelled (or `duration` elapses) and every worker has
    /// exited.
    pub async fn run(self) -> Result<RunSummary> {
        let Self {
            config,
            requests,
            client,
            cancel,
            governor,
            feed,
            stats,
            progress,
        } = self;

        let len = NonZeroUsize::new(requests.len()).ok_or(Error::NoTargets)?;
        let cursor = Arc::new(SharedCursor::new(len));

        tracing::info!(
            targets = requests.len(),
            workers = config.workers,
            rate = config.rate,
            timeout = ?config.timeout,
            duration = ?config.duration,
            "starting run"
        );

        let started = Instant::now();

        let mut handles = Vec::new();
        for worker_id in 0..config.workers {
            let worker = Worker {
                id: worker_id,
                timeout: config.timeout,
                governor: governor.clone(),
                cursor: cursor.clone(),
                requests: requests.clone(),
                client: client.clone(),
                feed: feed.clone(),
                stats: stats.clone(),
            };
            handles.push(tokio::spawn(worker.run()));
        }

        let deadline_handle = config.duration.map(|duration| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    _ = tokio::time::sleep(duration) => {
                        tracing::info!(?duration, "run duration reached");
                        cancel.cancel();
                    }
                }
            })
        });

        // Ticks always run: they feed the per-second rate stats even without an observer.
        let tick_handle = {
            let stats = stats.clone();
            let governor = governor.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(PROGRESS_INTERVAL);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                // The first tick completes immediately.
                interval.tick().await;

                let mut tick_id: u64 = 0;
                let mut last_at = Instant::now();
                let mut last_totals = stats.totals();

                loop {
                    interval.tick().await;

                    tick_id = tick_id.saturating_add(1);
                    let now = Instant::now();
                    let dt = now.duration_since(last_at);
                    last_at = now;

                    let totals = stats.totals();
                    let delta = totals.saturating_sub(&last_totals);
                    last_totals = totals;

                    let rps_now = delta.total() as f64 / dt.as_secs_f64().max(1e-9);
                    stats.record_rps_sample(rps_now);
                    let latency_now = stats.take_window_latency();

                    if let Some(progress) = &progress {
                        (progress)(ProgressUpdate {
                            tick: tick_id,
                            elapsed: started.elapsed(),
                            interval: dt,
                            target_rate: governor.rate(),
                            rps_now,
                            error_rate_now: delta.error_rate(),
                            totals,
                            latency_now,
                        });
                    }
                }
            })
        };

        let mut first_err = None;
        for h in handles {
            if let Err(err) = h.await {
                // Stop the remaining workers too.
                cancel.cancel();
                first_err.get_or_insert(Error::Join(err));
            }
        }
        let elapsed = started.elapsed();

        if let Some(h) = deadline_handle {
            h.abort();
            let _ = h.await;
        }
        tick_handle.abort();
        let _ = tick_handle.await;

        if let Some(err) = first_err {
            return Err(err);
        }

        let summary = stats.summarize(elapsed);
        tracing::info!(
            requests = summary.totals.total(),
            failed = summary.totals.failed(),
            elapsed = ?elapsed,
            "run finished"
        );
        Ok(summary)
    }
}

struct Worker {
    id: u64,
    timeout: Duration,
    governor: Arc<RateGovernor>,
    cursor: Arc<SharedCursor>,
    requests: Arc<[HttpRequest]>,
    client: Arc<HttpClient>,
    feed: Arc<ChartFeed>,
    stats: Arc<RunStats>,
}

impl Worker {
    async fn run(self) {
        let mut sent: u64 = 0;
        while self.governor.acquire().await == Acquire::Permit {
            let Some(req) = self.requests.get(self.cursor.next_index()) else {
                break;
            };

            let sample = dispatch(&self.client, req, self.timeout).await;
            self.stats.record(&sample);
            self.feed.append(sample);
            sent += 1;
        }
        tracing::debug!(worker = self.id, sent, "worker stopped");
    }
}

/// Issue one request and classify the result. The timeout bounds the whole exchange.
pub async fn dispatch(client: &HttpClient, req: &HttpRequest, timeout: Duration) -> Sample {
    let started = Instant::now();
    let res = tokio::time::timeout(timeout, client.request(req)).await;
    let latency = started.elapsed();

    match res {
        Err(_) => Sample::new(latency, Outcome::Timeout, None),
        Ok(Ok(resp)) => Sample::new(
            latency,
            Outcome::from_status(resp.status),
            Some(resp.status),
        ),
        Ok(Err(err)) if err.is_timeout() => Sample::new(latency, Outcome::Timeout, None),
        Ok(Err(err)) => {
            tracing::debug!(
                url = %req.url,
                kind = %err.transport_error_kind(),
                error = %err,
                "request failed"
            );
            Sample::new(latency, Outcome::TransportError, None)
        }
    }
}
