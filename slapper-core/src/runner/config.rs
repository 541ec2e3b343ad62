use std::time::Duration;

use super::error::{Error, Result};

pub const DEFAULT_WORKERS: u64 = 8;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_RATE: u64 = 50;
pub const DEFAULT_MIN_Y: Duration = Duration::ZERO;
pub const DEFAULT_MAX_Y: Duration = Duration::from_millis(100);
pub const DEFAULT_CHART_CAPACITY: usize = 4096;

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Concurrent workers; bounds requests in flight.
    pub workers: u64,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Aggregate requests per second across all workers.
    pub rate: u64,
    pub min_y: Duration,
    pub max_y: Duration,
    /// Extra `Key: Value` headers added to every request, in flag order.
    pub headers: Vec<String>,
    /// Stop on our own after this long. `None` runs until cancelled.
    pub duration: Option<Duration>,
    /// Samples kept in the live chart window.
    pub chart_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            rate: DEFAULT_RATE,
            min_y: DEFAULT_MIN_Y,
            max_y: DEFAULT_MAX_Y,
            headers: Vec::new(),
            duration: None,
            chart_capacity: DEFAULT_CHART_CAPACITY,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rate == 0 {
            return Err(Error::InvalidRate);
        }
        if self.workers == 0 {
            return Err(Error::InvalidWorkers);
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidTimeout);
        }
        if self.min_y >= self.max_y {
            return Err(Error::InvalidAxis {
                min: self.min_y,
                max: self.max_y,
            });
        }
        self.extra_headers()?;
        Ok(())
    }

    /// Parsed `headers`, in flag order.
    pub fn extra_headers(&self) -> Result<Vec<(String, String)>> {
        self.headers.iter().map(|raw| parse_header(raw)).collect()
    }
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| Error::InvalidHeader(raw.to_string()))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidHeader(raw.to_string()));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
