use std::time::Duration;

use crate::ParseError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("invalid target file: {0}")]
    Parse(#[from] ParseError),

    #[error("`rate` must be a positive integer")]
    InvalidRate,

    #[error("`workers` must be a positive integer")]
    InvalidWorkers,

    #[error("`timeout` must be a positive duration")]
    InvalidTimeout,

    #[error("chart bounds must satisfy minY < maxY (got minY={min:?}, maxY={max:?})")]
    InvalidAxis { min: Duration, max: Duration },

    #[error("target file contains no targets")]
    NoTargets,

    #[error("invalid header `{0}` (expected `Key: Value`)")]
    InvalidHeader(String),

    #[error("target #{index}: invalid http method `{method}`")]
    InvalidMethod { index: usize, method: String },
}

impl Error {
    /// Errors caused by user input (flags or target file) rather than the environment.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, Self::Io(_) | Self::Join(_))
    }
}
