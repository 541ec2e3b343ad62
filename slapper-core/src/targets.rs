//! Target file parsing.
//!
//! A target file is line oriented:
//!
//! ```text
//! POST http://127.0.0.1:5000/test
//! H Content-Type: application/json
//! $ {"foo": "bar"}
//!
//! GET http://127.0.0.1:5000/health
//! ```
//!
//! `<method> <url>` opens a target, `H name: value` adds a header value to the open target,
//! `$ body` sets its body. Every other line is ignored.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: body is not valid base64: {source}")]
    InvalidBase64 {
        line: usize,
        #[source]
        source: base64::DecodeError,
    },
}

impl ParseError {
    /// 1-based line number of the offending line.
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::InvalidBase64 { line, .. } => *line,
        }
    }
}

/// Header name to values, in declaration order.
///
/// Names are compared case-sensitively; `X-A` and `x-a` are separate entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, Vec<String>)>,
}

impl HeaderSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        match self.entries.iter_mut().find(|(k, _)| k == name) {
            Some((_, values)) => values.push(value.into()),
            None => self.entries.push((name.to_string(), vec![value.into()])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_slice())
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Flattened `(name, value)` pairs, one per value.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .flat_map(|(k, values)| values.iter().map(move |v| (k.as_str(), v.as_str())))
    }
}

/// One request definition from the target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    method: String,
    url: String,
    headers: HeaderSet,
    body: Bytes,
}

impl Target {
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Empty when the target had no `$` line.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetList {
    targets: Vec<Target>,
}

impl TargetList {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Target> {
        self.targets.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Target> {
        self.targets.iter()
    }

    pub fn as_slice(&self) -> &[Target] {
        &self.targets
    }
}

impl<'a> IntoIterator for &'a TargetList {
    type Item = &'a Target;
    type IntoIter = std::slice::Iter<'a, Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.iter()
    }
}

/// How a single line of a target file is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    Header { name: &'a str, value: &'a str },
    Body(&'a str),
    Start { method: &'a str, url: &'a str },
    Ignored,
}

impl<'a> Line<'a> {
    /// Prefixes are checked before the `<method> <url>` shape.
    pub(crate) fn classify(line: &'a str) -> Self {
        if let Some(rest) = line.strip_prefix("H ") {
            return match rest.split_once(':') {
                Some((name, value)) => Line::Header {
                    name,
                    value: value.strip_prefix(' ').unwrap_or(value),
                },
                None => Line::Ignored,
            };
        }

        if let Some(rest) = line.strip_prefix("$ ") {
            return Line::Body(rest);
        }

        match line.split_once(' ') {
            Some((method, url))
                if !method.is_empty()
                    && !method.chars().any(char::is_whitespace)
                    && !url.is_empty() =>
            {
                Line::Start { method, url }
            }
            _ => Line::Ignored,
        }
    }
}

#[derive(Debug)]
struct PendingTarget {
    method: String,
    url: String,
    headers: HeaderSet,
    body: Option<Bytes>,
}

impl PendingTarget {
    fn open(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            headers: HeaderSet::new(),
            body: None,
        }
    }

    fn finalize(self) -> Target {
        Target {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default)]
enum ParserState {
    #[default]
    Closed,
    Open(PendingTarget),
}

/// Incremental target file parser.
///
/// Feed lines in order with [`TargetParser::feed_line`], then call
/// [`TargetParser::finish`] to close the last open target.
#[derive(Debug)]
pub struct TargetParser {
    base64_body: bool,
    line: usize,
    state: ParserState,
    targets: Vec<Target>,
}

impl TargetParser {
    pub fn new(base64_body: bool) -> Self {
        Self {
            base64_body,
            line: 0,
            state: ParserState::Closed,
            targets: Vec::new(),
        }
    }

    /// Whether a target is currently accepting `H`/`$` lines.
    pub fn is_open(&self) -> bool {
        matches!(self.state, ParserState::Open(_))
    }

    pub fn feed_line(&mut self, raw: &str) -> Result<(), ParseError> {
        self.line += 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);

        match Line::classify(raw) {
            Line::Header { name, value } => {
                if let ParserState::Open(pending) = &mut self.state {
                    pending.headers.append(name, value);
                }
            }
            Line::Body(content) => {
                let body = self.decode_body(content)?;
                if let ParserState::Open(pending) = &mut self.state {
                    pending.body = Some(body);
                }
            }
            Line::Start { method, url } => {
                let next = ParserState::Open(PendingTarget::open(method, url));
                self.close_with(next);
            }
            Line::Ignored => {}
        }

        Ok(())
    }

    pub fn finish(mut self) -> TargetList {
        self.close_with(ParserState::Closed);
        TargetList {
            targets: self.targets,
        }
    }

    fn close_with(&mut self, next: ParserState) {
        if let ParserState::Open(pending) = std::mem::replace(&mut self.state, next) {
            self.targets.push(pending.finalize());
        }
    }

    fn decode_body(&self, content: &str) -> Result<Bytes, ParseError> {
        if !self.base64_body {
            return Ok(Bytes::copy_from_slice(content.as_bytes()));
        }

        BASE64
            .decode(content)
            .map(Bytes::from)
            .map_err(|source| ParseError::InvalidBase64 {
                line: self.line,
                source,
            })
    }
}

/// Parse a whole target file.
pub fn parse_targets(input: &str, base64_body: bool) -> Result<TargetList, ParseError> {
    let mut parser = TargetParser::new(base64_body);
    for line in input.split('\n') {
        parser.feed_line(line)?;
    }
    Ok(parser.finish())
}
