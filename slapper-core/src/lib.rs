#![forbid(unsafe_code)]

mod targets;

pub mod runner;

pub use runner::{Error, Result};
pub use slapper_http::{HttpClient, HttpRequest, HttpResponse, HttpTransportErrorKind};
pub use targets::{HeaderSet, ParseError, Target, TargetList, TargetParser, parse_targets};
