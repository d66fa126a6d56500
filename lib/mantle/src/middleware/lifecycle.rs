//! Shared host lifecycle state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use super::foreground::{BackgroundObserver, ForegroundFuture};

/// Background/foreground state of the host, fed by its lifecycle hooks.
///
/// Cloning shares the state. Hand out [`LifecycleMonitor::observer`] to
/// [`super::RetryOnForeground`]:
///
/// ```
/// use mantle::middleware::{BackgroundObserver, LifecycleMonitor};
///
/// let monitor = LifecycleMonitor::new();
/// let mut observer = monitor.observer();
/// observer.start();
///
/// monitor.enter_background();
/// monitor.enter_foreground();
/// assert!(observer.was_in_background());
///
/// observer.reset();
/// assert!(!observer.was_in_background());
/// ```
#[derive(Debug, Clone)]
pub struct LifecycleMonitor {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    in_background: watch::Sender<bool>,
    // Number of foreground -> background transitions so far.
    transitions: AtomicU64,
}

impl LifecycleMonitor {
    /// Create a monitor in the foreground state.
    #[must_use]
    pub fn new() -> Self {
        let (in_background, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                in_background,
                transitions: AtomicU64::new(0),
            }),
        }
    }

    /// Record that the host moved to the background.
    pub fn enter_background(&self) {
        let was_foreground = !self.shared.in_background.send_replace(true);
        if was_foreground {
            self.shared.transitions.fetch_add(1, Ordering::AcqRel);
        }
    }

    /// Record that the host is back in the foreground.
    pub fn enter_foreground(&self) {
        self.shared.in_background.send_replace(false);
    }

    /// Returns `true` while the host is in the background.
    #[must_use]
    pub fn is_in_background(&self) -> bool {
        *self.shared.in_background.borrow()
    }

    /// A new observer of this monitor.
    #[must_use]
    pub fn observer(&self) -> MonitorObserver {
        MonitorObserver {
            monitor: self.clone(),
            started_at: None,
        }
    }

    fn transitions(&self) -> u64 {
        self.shared.transitions.load(Ordering::Acquire)
    }
}

impl Default for LifecycleMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// [`BackgroundObserver`] backed by a [`LifecycleMonitor`].
#[derive(Debug, Clone)]
pub struct MonitorObserver {
    monitor: LifecycleMonitor,
    started_at: Option<u64>,
}

impl BackgroundObserver for MonitorObserver {
    fn start(&mut self) {
        self.started_at = Some(self.monitor.transitions());
    }

    fn reset(&mut self) {
        self.started_at = None;
    }

    fn was_in_background(&self) -> bool {
        self.started_at
            .is_some_and(|start| self.monitor.transitions() > start)
    }

    fn foreground(&self) -> ForegroundFuture {
        let mut in_background = self.monitor.shared.in_background.subscribe();
        Box::pin(async move {
            // Every monitor handle dropped: nothing left to wait for.
            let _ = in_background.wait_for(|background| !background).await;
        })
    }
}
