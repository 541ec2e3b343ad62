use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::error::{Error, Result};
use super::sample::{Outcome, Sample};

/// Vertical range of the latency chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisBounds {
    min: Duration,
    max: Duration,
}

impl AxisBounds {
    pub fn new(min: Duration, max: Duration) -> Result<Self> {
        if min >= max {
            return Err(Error::InvalidAxis { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn clamp(&self, latency: Duration) -> Duration {
        latency.clamp(self.min, self.max)
    }

    pub fn min_ms(&self) -> f64 {
        self.min.as_secs_f64() * 1000.0
    }

    pub fn max_ms(&self) -> f64 {
        self.max.as_secs_f64() * 1000.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChartPoint {
    /// Completion time relative to the feed's creation.
    pub at: Duration,
    /// Latency as drawn, clamped to the axis bounds.
    pub display: Duration,
    pub sample: Sample,
}

impl ChartPoint {
    pub fn is_clipped(&self) -> bool {
        self.display != self.sample.latency
    }
}

/// Point-in-time copy of the chart window, oldest sample first.
#[derive(Debug, Clone)]
pub struct ChartView {
    pub bounds: AxisBounds,
    pub points: Vec<ChartPoint>,
    /// Samples appended since the feed was created, including evicted ones.
    pub appended_total: u64,
}

impl ChartView {
    /// Time span covered by the window, in seconds. Never empty.
    pub fn x_bounds(&self) -> (f64, f64) {
        if self.points.is_empty() {
            return (0.0, 1.0);
        }

        let mut lo = f64::MAX;
        let mut hi = f64::MIN;
        for p in &self.points {
            let x = p.at.as_secs_f64();
            lo = lo.min(x);
            hi = hi.max(x);
        }
        if hi - lo < 1.0 {
            hi = lo + 1.0;
        }
        (lo, hi)
    }

    /// `(seconds, milliseconds)` pairs for one outcome class, ready for plotting.
    pub fn series(&self, outcome: Outcome) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .filter(|p| p.sample.outcome == outcome)
            .map(|p| (p.at.as_secs_f64(), p.display.as_secs_f64() * 1000.0))
            .collect()
    }

    pub fn clipped(&self) -> usize {
        self.points.iter().filter(|p| p.is_clipped()).count()
    }
}

/// Bounded window of the most recent samples, shared between workers and the renderer.
#[derive(Debug)]
pub struct ChartFeed {
    origin: Instant,
    bounds: AxisBounds,
    capacity: usize,
    window: Mutex<VecDeque<Sample>>,
    appended_total: AtomicU64,
}

impl ChartFeed {
    pub fn new(bounds: AxisBounds, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            origin: Instant::now(),
            bounds,
            capacity,
            window: Mutex::new(VecDeque::with_capacity(capacity)),
            appended_total: AtomicU64::new(0),
        }
    }

    pub fn bounds(&self) -> AxisBounds {
        self.bounds
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, sample: Sample) {
        {
            let mut window = self.window.lock();
            if window.len() == self.capacity {
                window.pop_front();
            }
            window.push_back(sample);
        }
        self.appended_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ChartView {
        let samples: Vec<Sample> = self.window.lock().iter().copied().collect();

        let points = samples
            .into_iter()
            .map(|sample| ChartPoint {
                at: sample.completed_at.saturating_duration_since(self.origin),
                display: self.bounds.clamp(sample.latency),
                sample,
            })
            .collect();

        ChartView {
            bounds: self.bounds,
            points,
            appended_total: self.appended_total.load(Ordering::Relaxed),
        }
    }
}
