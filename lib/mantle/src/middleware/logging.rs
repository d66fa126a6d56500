//! Request/response logging middleware.
//!
//! This middleware logs HTTP requests and responses using the `tracing` crate.
//! What is logged, and at which level, is read from the call's [`Configs`]
//! (see [`ConfigsExt::log_level`] and [`ConfigsExt::logging_components`]), so
//! a derived client can change it without re-registering the middleware.

use std::fmt::Write as _;
use std::time::Instant;

use mantle_core::{Body, ChainFuture, Configs, Middleware, Next, Request, Response};
use tracing::{Instrument, Level, span, warn};

use crate::configs::ConfigsExt;

/// Bodies longer than this are truncated in logs.
const MAX_LOGGED_BODY: usize = 1024;

/// Level of the request/response events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// `TRACE` events.
    Trace,
    /// `DEBUG` events.
    Debug,
    /// `INFO` events.
    #[default]
    Info,
    /// `WARN` events.
    Warn,
    /// `ERROR` events.
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Self::TRACE,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Info => Self::INFO,
            LogLevel::Warn => Self::WARN,
            LogLevel::Error => Self::ERROR,
        }
    }
}

// `tracing` levels must be constants at the call site.
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
            LogLevel::Warn => tracing::warn!($($arg)+),
            LogLevel::Error => tracing::error!($($arg)+),
        }
    };
}

/// Parts of the exchange to include in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::struct_excessive_bools)]
pub struct LoggingComponents {
    /// Request method.
    pub method: bool,
    /// Request URL.
    pub url: bool,
    /// Request headers.
    pub request_headers: bool,
    /// Request body.
    pub request_body: bool,
    /// Response status.
    pub status: bool,
    /// Response headers.
    pub response_headers: bool,
    /// Response body.
    pub response_body: bool,
    /// Time spent in the rest of the chain.
    pub duration: bool,
}

impl LoggingComponents {
    /// Log nothing.
    pub const NONE: Self = Self {
        method: false,
        url: false,
        request_headers: false,
        request_body: false,
        status: false,
        response_headers: false,
        response_body: false,
        duration: false,
    };

    /// Method, URL, status and duration.
    pub const STANDARD: Self = Self {
        method: true,
        url: true,
        status: true,
        duration: true,
        ..Self::NONE
    };

    /// Everything, including headers and bodies.
    pub const ALL: Self = Self {
        method: true,
        url: true,
        request_headers: true,
        request_body: true,
        status: true,
        response_headers: true,
        response_body: true,
        duration: true,
    };

    /// Returns `true` if no component is enabled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::NONE
    }
}

impl Default for LoggingComponents {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Middleware that logs requests and responses.
///
/// Register it outermost to time the whole chain, or innermost to log what
/// actually reaches the transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging;

impl Logging {
    /// Create a new logging middleware.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Middleware for Logging {
    fn intercept(
        &self,
        request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        let components = configs.logging_components();
        if components.is_empty() {
            return next.run(request, body, configs);
        }

        let level = configs.log_level();
        let valid_status = configs.valid_status();
        let span = span!(
            Level::INFO,
            "http_request",
            method = %request.method(),
            url = %request.url()
        );

        let line = describe_request(&request, body.as_ref(), components);
        let future = next.run(request, body, configs);

        Box::pin(
            async move {
                let start = Instant::now();
                log_at!(level, "--> {line}");

                let result = future.await;

                // Saturating conversion to u64 (truncates after ~584 million years)
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let line = describe_response(response, elapsed_ms, components);
                        if valid_status.contains(&response.status()) {
                            log_at!(level, "<-- {line}");
                        } else {
                            warn!("<-- {line}");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "request failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }
}

fn describe_request(
    request: &Request,
    body: Option<&Body>,
    components: LoggingComponents,
) -> String {
    let mut line = String::new();
    if components.method {
        let _ = write!(line, "{} ", request.method());
    }
    if components.url {
        let _ = write!(line, "{} ", request.url());
    }
    if components.request_headers {
        for (name, value) in request.headers() {
            let _ = write!(line, "\n  {name}: {}", redact(name, value));
        }
    }
    if components.request_body {
        match body {
            Some(Body::Bytes(bytes)) => {
                let _ = write!(line, "\n  {}", preview(bytes));
            }
            Some(Body::Deferred(_)) => line.push_str("\n  <deferred body>"),
            None => {}
        }
    }
    line.trim_end().to_string()
}

fn describe_response(
    response: &Response,
    elapsed_ms: u64,
    components: LoggingComponents,
) -> String {
    let mut line = String::new();
    if components.status {
        let _ = write!(line, "{} ", response.status());
    }
    if components.duration {
        let _ = write!(line, "({elapsed_ms}ms) ");
    }
    if components.response_headers {
        for (name, value) in response.headers() {
            let _ = write!(line, "\n  {name}: {}", redact(name, value));
        }
    }
    if components.response_body && !response.body().is_empty() {
        let _ = write!(line, "\n  {}", preview(response.body()));
    }
    line.trim_end().to_string()
}

fn redact<'a>(name: &http::HeaderName, value: &'a http::HeaderValue) -> &'a str {
    if value.is_sensitive() || *name == http::header::AUTHORIZATION {
        "<redacted>"
    } else {
        value.to_str().unwrap_or("<binary>")
    }
}

fn preview(bytes: &[u8]) -> String {
    match bytes.get(..MAX_LOGGED_BODY) {
        Some(head) if bytes.len() > MAX_LOGGED_BODY => format!(
            "{}… ({} bytes)",
            String::from_utf8_lossy(head),
            bytes.len()
        ),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue, Method};

    use super::*;

    fn request() -> Request {
        Request::builder(
            Method::POST,
            url::Url::parse("https://petstore.example/pets?limit=2").expect("valid url"),
        )
        .header("authorization", "Bearer secret")
        .header("x-request-id", "42")
        .build()
    }

    #[test]
    fn standard_components() {
        let line = describe_request(&request(), None, LoggingComponents::STANDARD);
        insta::assert_snapshot!(line, @"POST https://petstore.example/pets?limit=2");

        let response = Response::new(201, HeaderMap::new(), Bytes::from_static(b"{}"));
        let line = describe_response(&response, 12, LoggingComponents::STANDARD);
        insta::assert_snapshot!(line, @"201 (12ms)");
    }

    #[test]
    fn all_components_redact_credentials() {
        let body = Body::from(r#"{"name":"Rex"}"#);
        let line = describe_request(&request(), Some(&body), LoggingComponents::ALL);

        assert!(line.contains("authorization: <redacted>"));
        assert!(line.contains("x-request-id: 42"));
        assert!(line.contains(r#"{"name":"Rex"}"#));
        assert!(!line.contains("secret"));
    }

    #[test]
    fn sensitive_response_headers_are_redacted() {
        let mut headers = HeaderMap::new();
        let mut cookie = HeaderValue::from_static("session=abc");
        cookie.set_sensitive(true);
        headers.insert("set-cookie", cookie);

        let response = Response::new(200, headers, Bytes::new());
        let line = describe_response(&response, 0, LoggingComponents::ALL);
        assert!(line.starts_with("200 (0ms)"));
        assert!(line.contains("set-cookie: <redacted>"));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let bytes = vec![b'a'; MAX_LOGGED_BODY + 10];
        let preview = preview(&bytes);
        assert!(preview.ends_with(&format!("… ({} bytes)", MAX_LOGGED_BODY + 10)));
    }

    #[test]
    fn log_level_maps_to_tracing() {
        assert_eq!(Level::from(LogLevel::default()), Level::INFO);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert!(LogLevel::Debug < LogLevel::Warn);
    }

    #[test]
    fn empty_components() {
        assert!(LoggingComponents::NONE.is_empty());
        assert!(!LoggingComponents::default().is_empty());
    }
}
