mod chart;
mod config;
mod cursor;
mod error;
mod pacer;
mod progress;
mod request;
mod run;
mod sample;
mod stats;

pub use chart::{AxisBounds, ChartFeed, ChartPoint, ChartView};
pub use config::{
    DEFAULT_CHART_CAPACITY, DEFAULT_MAX_Y, DEFAULT_MIN_Y, DEFAULT_RATE, DEFAULT_TIMEOUT,
    DEFAULT_WORKERS, RunConfig,
};
pub use cursor::SharedCursor;
pub use error::{Error, Result};
pub use pacer::{Acquire, RateGovernor};
pub use progress::{ProgressFn, ProgressUpdate};
pub use request::prepare_requests;
pub use run::{Runner, dispatch};
pub use sample::{Outcome, Sample};
pub use stats::{
    LatencySummary, OutcomeTotals, RunStats, RunSummary, StatusClasses, WindowLatency,
};
