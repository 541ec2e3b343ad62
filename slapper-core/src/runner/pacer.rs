use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::error::{Error, Result};

const NANOS_PER_SEC: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquire {
    Permit,
    Cancelled,
}

/// Paces dispatches across all workers to a fixed aggregate rate.
///
/// Permit slots are spaced exactly `1 / rate` apart on one shared clock. Each `acquire`
/// reserves the slot one period after the last reserved one and sleeps until it. A slot
/// that would already be in the past is moved to "now", so idle time never turns into a
/// burst of back-to-back permits.
#[derive(Debug)]
pub struct RateGovernor {
    origin: Instant,
    /// Last reserved slot, in nanoseconds since `origin`.
    last_slot_ns: AtomicU64,
    period_ns: AtomicU64,
    rate: AtomicU64,
    cancel: CancellationToken,
}

impl RateGovernor {
    pub fn new(rate: u64, cancel: CancellationToken) -> Result<Self> {
        if rate == 0 {
            return Err(Error::InvalidRate);
        }

        Ok(Self {
            origin: Instant::now(),
            last_slot_ns: AtomicU64::new(0),
            period_ns: AtomicU64::new(period_ns(rate)),
            rate: AtomicU64::new(rate),
            cancel,
        })
    }

    pub fn rate(&self) -> u64 {
        self.rate.load(Ordering::Relaxed)
    }

    /// Slots already handed out are kept; the new period applies from the next reservation
    /// on.
    pub fn set_rate(&self, rate: u64) -> Result<()> {
        if rate == 0 {
            return Err(Error::InvalidRate);
        }
        self.period_ns.store(period_ns(rate), Ordering::Relaxed);
        self.rate.store(rate, Ordering::Relaxed);
        Ok(())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the next permit, or return [`Acquire::Cancelled`] as soon as the run is
    /// cancelled.
    pub async fn acquire(&self) -> Acquire {
        if self.cancel.is_cancelled() {
            return Acquire::Cancelled;
        }

        let slot = self.reserve_slot();
        if slot <= Instant::now() {
            return Acquire::Permit;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Acquire::Cancelled,
            _ = tokio::time::sleep_until(slot) => Acquire::Permit,
        }
    }

    fn reserve_slot(&self) -> Instant {
        loop {
            let now_ns = u64::try_from(self.origin.elapsed().as_nanos()).unwrap_or(u64::MAX);
            let last = self.last_slot_ns.load(Ordering::Acquire);
            let period = self.period_ns.load(Ordering::Relaxed);
            let slot = last.saturating_add(period).max(now_ns);

            if self
                .last_slot_ns
                .compare_exchange_weak(last, slot, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return self.origin + Duration::from_nanos(slot);
            }
        }
    }
}

fn period_ns(rate: u64) -> u64 {
    (NANOS_PER_SEC / rate).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn governor(rate: u64) -> (Arc<RateGovernor>, CancellationToken) {
        let cancel = CancellationToken::new();
        let gov = RateGovernor::new(rate, cancel.clone())
            .unwrap_or_else(|err| panic!("failed to create governor: {err}"));
        (Arc::new(gov), cancel)
    }

    #[test]
    fn zero_rate_is_rejected() {
        let res = RateGovernor::new(0, CancellationToken::new());
        assert!(matches!(res, Err(Error::InvalidRate)));

        let (gov, _cancel) = governor(10);
        assert!(matches!(gov.set_rate(0), Err(Error::InvalidRate)));
        assert_eq!(gov.rate(), 10);
    }

    async fn permits_over(rate: u64, acquirers: usize, window: Duration) -> u64 {
        let (gov, cancel) = governor(rate);
        let granted = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..acquirers {
            let gov = gov.clone();
            let granted = granted.clone();
            handles.push(tokio::spawn(async move {
                while gov.acquire().await == Acquire::Permit {
                    granted.fetch_add(1, Ordering::Relaxed);
                }
            }));
        }

        tokio::time::sleep(window).await;
        cancel.cancel();
        for h in handles {
            h.await.unwrap_or_else(|err| panic!("acquirer panicked: {err}"));
        }

        granted.load(Ordering::Relaxed)
    }

    #[tokio::test(start_paused = true)]
    async fn permits_track_rate_times_window() {
        for (rate, acquirers, secs) in [(50u64, 1usize, 4u64), (100, 8, 2), (7, 3, 10)] {
            let granted = permits_over(rate, acquirers, Duration::from_secs(secs)).await;
            let expected = rate * secs;
            assert!(
                granted.abs_diff(expected) <= 2,
                "rate={rate} acquirers={acquirers} secs={secs}: granted={granted}, expected≈{expected}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permits_do_not_scale_with_acquirers() {
        let one = permits_over(20, 1, Duration::from_secs(5)).await;
        let many = permits_over(20, 32, Duration::from_secs(5)).await;
        assert!(one.abs_diff(many) <= 2, "one={one} many={many}");
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_does_not_accumulate_burst() {
        let (gov, _cancel) = governor(10);
        assert_eq!(gov.acquire().await, Acquire::Permit);

        tokio::time::sleep(Duration::from_secs(5)).await;

        let started = Instant::now();
        for _ in 0..3 {
            assert_eq!(gov.acquire().await, Acquire::Permit);
        }
        // The first permit after the pause is immediate, the next two are one period apart.
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_releases_blocked_acquirer() {
        let (gov, cancel) = governor(1);
        assert_eq!(gov.acquire().await, Acquire::Permit);

        let started = Instant::now();
        let waiter = {
            let gov = gov.clone();
            tokio::spawn(async move { gov.acquire().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        let res = waiter
            .await
            .unwrap_or_else(|err| panic!("waiter panicked: {err}"));
        assert_eq!(res, Acquire::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn no_permits_after_cancel() {
        let (gov, cancel) = governor(1_000);
        cancel.cancel();
        for _ in 0..10 {
            assert_eq!(gov.acquire().await, Acquire::Cancelled);
        }
        assert!(gov.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn set_rate_changes_spacing() {
        let (gov, _cancel) = governor(1);
        assert_eq!(gov.acquire().await, Acquire::Permit);
        assert_eq!(gov.acquire().await, Acquire::Permit);

        gov.set_rate(100).unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(gov.rate(), 100);

        let started = Instant::now();
        for _ in 0..10 {
            assert_eq!(gov.acquire().await, Acquire::Permit);
        }
        assert!(started.elapsed() < Duration::from_millis(200));
    }
}
