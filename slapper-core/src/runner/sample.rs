use std::time::{Duration, Instant};

/// How a single dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// 2xx or 3xx response.
    Success,
    /// Any other status.
    HttpError,
    /// Connect/TLS/IO failure before a full response was read.
    TransportError,
    /// The request did not finish within the per-request timeout.
    Timeout,
}

impl Outcome {
    pub fn from_status(status: u16) -> Self {
        if (200..400).contains(&status) {
            Self::Success
        } else {
            Self::HttpError
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    pub const ALL: [Outcome; 4] = [
        Self::Success,
        Self::HttpError,
        Self::TransportError,
        Self::Timeout,
    ];
}

/// One observed request, produced by a worker and consumed by the chart feed and the stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub latency: Duration,
    pub outcome: Outcome,
    pub status: Option<u16>,
    pub completed_at: Instant,
}

impl Sample {
    pub fn new(latency: Duration, outcome: Outcome, status: Option<u16>) -> Self {
        Self {
            latency,
            outcome,
            status,
            completed_at: Instant::now(),
        }
    }
}
