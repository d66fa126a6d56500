//! Retry middleware for HTTP requests.
//!
//! Replays the rest of the chain when the outcome looks transient. This is a
//! network concern, distinct from [`super::RetryOnForeground`] which reacts
//! to the host being suspended.

use std::time::Duration;

use bytes::Bytes;
use mantle_core::{Body, ChainFuture, Configs, Error, Middleware, Next, Request, Response};
use tracing::debug;

/// Middleware retrying transient failures.
///
/// By default, retries:
/// - Connection errors and timeouts
/// - 5xx server errors
/// - 429 Too Many Requests
///
/// Once the budget is spent the last outcome is returned unchanged.
///
/// # Example
///
/// ```
/// use mantle::middleware::Retry;
/// use std::time::Duration;
///
/// let retry = Retry::new(3).with_backoff(Duration::from_millis(100));
/// # let _ = retry;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    max_retries: u32,
    backoff: Duration,
}

impl Retry {
    /// Create a new retry middleware with the given maximum number of retries.
    #[must_use]
    pub const fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            backoff: Duration::ZERO,
        }
    }

    /// Wait `backoff` before each retry.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Maximum number of retries.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Returns `true` if the response should be retried.
    fn should_retry_response(response: &Response<Bytes>) -> bool {
        let status = response.status();
        status >= 500 || status == 429
    }

    /// Returns `true` if the error should be retried.
    fn should_retry_error(error: &Error) -> bool {
        error.is_connection() || error.is_timeout()
    }
}

impl Middleware for Retry {
    fn intercept(
        &self,
        request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        let Self {
            max_retries,
            backoff,
        } = *self;

        Box::pin(async move {
            let mut remaining = max_retries;
            loop {
                let result = next
                    .run(request.clone(), body.clone(), configs.clone())
                    .await;

                let should_retry = match &result {
                    Ok(response) => Self::should_retry_response(response),
                    Err(error) => Self::should_retry_error(error),
                };
                if !should_retry || remaining == 0 {
                    return result;
                }

                remaining -= 1;
                debug!(
                    attempt = max_retries - remaining,
                    max_retries, "retrying request"
                );
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
            }
        })
    }
}
