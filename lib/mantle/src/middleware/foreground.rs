//! Background-aware retry.
//!
//! When the host process is suspended in the middle of a call, the transport
//! often stalls or fails with a spurious error. [`RetryOnForeground`] asks a
//! [`BackgroundObserver`] whether such a suspension happened during an
//! attempt and, if so, replays the call once the process is back in the
//! foreground.
//!
//! ```text
//!           ┌───────── background, budget left ─────────┐
//!           ▼                                           │
//! Idle ──▶ attempt ──▶ AwaitingForeground ──▶ Retrying(n) ──▶ attempt ...
//!           │
//!           ├── no background ──────────────▶ result
//!           └── background, budget spent ──▶ Exhausted ──▶ result
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use mantle_core::{Body, ChainFuture, Configs, Middleware, Next, Request};
use tracing::{debug, warn};

use crate::configs::ConfigsExt;

/// Future resolved once the host is back in the foreground.
pub type ForegroundFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Per-call source of background transitions.
///
/// A fresh observer is created for every call; it is reset and started
/// before every attempt of that call.
pub trait BackgroundObserver: Send + 'static {
    /// Start watching for background transitions.
    fn start(&mut self);

    /// Forget transitions seen so far and stop watching.
    fn reset(&mut self);

    /// Returns `true` if the host went to the background since [`start`](Self::start).
    fn was_in_background(&self) -> bool;

    /// Resolves when the host is in the foreground.
    ///
    /// The default resolves immediately.
    fn foreground(&self) -> ForegroundFuture {
        Box::pin(std::future::ready(()))
    }
}

impl<O: BackgroundObserver + ?Sized> BackgroundObserver for Box<O> {
    fn start(&mut self) {
        (**self).start();
    }

    fn reset(&mut self) {
        (**self).reset();
    }

    fn was_in_background(&self) -> bool {
        (**self).was_in_background()
    }

    fn foreground(&self) -> ForegroundFuture {
        (**self).foreground()
    }
}

/// Progress of one call through [`RetryOnForeground`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetryState {
    /// First attempt.
    Idle,
    /// The last attempt was interrupted; waiting for the foreground before
    /// retry number `retries + 1`.
    AwaitingForeground {
        /// Retries already performed.
        retries: u32,
    },
    /// Running retry number `n`.
    Retrying(u32),
    /// The last attempt was interrupted but the budget is spent.
    Exhausted,
}

impl RetryState {
    /// Retries performed so far.
    #[must_use]
    pub const fn retries(self) -> u32 {
        match self {
            Self::Idle | Self::Exhausted => 0,
            Self::AwaitingForeground { retries } | Self::Retrying(retries) => retries,
        }
    }

    /// State after an attempt finished.
    ///
    /// Returns `None` when the attempt's result should be surfaced as-is
    /// because no background transition happened.
    #[must_use]
    pub fn after_attempt(self, was_in_background: bool, limit: Option<u32>) -> Option<Self> {
        if !was_in_background {
            return None;
        }
        let retries = self.retries();
        if limit.is_some_and(|limit| retries >= limit) {
            Some(Self::Exhausted)
        } else {
            Some(Self::AwaitingForeground { retries })
        }
    }

    /// State once the foreground is back.
    #[must_use]
    pub const fn resume(self) -> Self {
        match self {
            Self::AwaitingForeground { retries } => Self::Retrying(retries + 1),
            other => other,
        }
    }
}

type ObserverFactory = dyn Fn() -> Box<dyn BackgroundObserver> + Send + Sync;

/// Middleware retrying calls interrupted by the host going to the background.
///
/// After each attempt, successful or not, the call is retried when the
/// observer reports a background transition and the budget allows it
/// (`limit` retries, or unlimited when `None`). Otherwise the attempt's
/// result is returned unchanged; a response with an unexpected status is not
/// a reason to retry by itself.
#[derive(Clone)]
pub struct RetryOnForeground {
    limit: Option<u32>,
    factory: Arc<ObserverFactory>,
}

impl RetryOnForeground {
    /// Create the middleware from an observer factory.
    ///
    /// # Example
    ///
    /// ```
    /// use mantle::middleware::{LifecycleMonitor, RetryOnForeground};
    ///
    /// let monitor = LifecycleMonitor::new();
    /// let retry = RetryOnForeground::new(Some(3), move || monitor.observer());
    /// # let _ = retry;
    /// ```
    pub fn new<F, O>(limit: Option<u32>, factory: F) -> Self
    where
        F: Fn() -> O + Send + Sync + 'static,
        O: BackgroundObserver,
    {
        Self {
            limit,
            factory: Arc::new(move || Box::new(factory()) as Box<dyn BackgroundObserver>),
        }
    }

    /// The retry budget, `None` meaning unlimited.
    #[must_use]
    pub const fn limit(&self) -> Option<u32> {
        self.limit
    }
}

impl fmt::Debug for RetryOnForeground {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOnForeground")
            .field("limit", &self.limit)
            .finish_non_exhaustive()
    }
}

impl Middleware for RetryOnForeground {
    fn intercept(
        &self,
        request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        let limit = self.limit;
        let mut observer = (self.factory)();

        Box::pin(async move {
            let valid_status = configs.valid_status();
            let mut state = RetryState::Idle;

            loop {
                observer.reset();
                observer.start();

                let result = next
                    .run(request.clone(), body.clone(), configs.clone())
                    .await;
                if let Ok(response) = &result
                    && !valid_status.contains(&response.status())
                {
                    debug!(
                        status = response.status(),
                        valid = ?valid_status,
                        "unexpected status"
                    );
                }

                let Some(after) = state.after_attempt(observer.was_in_background(), limit) else {
                    return result;
                };
                if after == RetryState::Exhausted {
                    warn!(
                        retries = state.retries(),
                        "interrupted by background, retry budget spent"
                    );
                    return result;
                }

                debug!(
                    retries = after.retries(),
                    "interrupted by background, awaiting foreground"
                );
                observer.foreground().await;
                state = after.resume();
                debug!(?state, "retrying after foreground");
            }
        })
    }
}
