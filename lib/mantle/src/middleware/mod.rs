//! Middleware for the mantle client.
//!
//! Every type here implements [`mantle_core::Middleware`] and can be
//! registered with [`crate::Client::layer`]. Most also have a shortcut on
//! [`crate::Client`]. Middleware registered first is outermost: it sees the
//! request first and the response last.
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `middleware-compression` | [`Compression`] and [`crate::codec`] |
//! | `middleware-basic-auth` | [`Credentials::Basic`] |
//!
//! # Available Middleware
//!
//! - [`Auth`] - Adds bearer, basic or API-key credentials, unless `auth_enabled` is off
//! - [`Logging`] - Logs requests/responses using `tracing`
//! - [`Retry`] - Retries 5xx, 429 and transport errors
//! - [`RetryOnForeground`] - Retries calls interrupted by the host going to the background
//! - [`Compression`] - Deflate-compresses request bodies
//!
//! # Example
//!
//! ```
//! use mantle::Client;
//! use mantle::middleware::{Credentials, DuplicateHeaderBehavior};
//!
//! let client = Client::hyper("https://api.example.com")?
//!     .with_logging()
//!     .with_retry(3)
//!     .auth(Credentials::bearer("my-token"))
//!     .compress_request(DuplicateHeaderBehavior::Replace);
//! # let _ = client;
//! # Ok::<(), mantle::Error>(())
//! ```
//!
//! Custom middleware is a type implementing [`mantle_core::Middleware`], or a
//! closure wrapped with [`from_fn`].

mod auth;
#[cfg(feature = "middleware-compression")]
mod compression;
mod foreground;
mod lifecycle;
mod logging;
mod retry;

pub use auth::{Auth, Credentials};
#[cfg(feature = "middleware-compression")]
pub use compression::{Compression, DuplicateHeaderBehavior};
pub use foreground::{BackgroundObserver, ForegroundFuture, RetryOnForeground, RetryState};
pub use lifecycle::{LifecycleMonitor, MonitorObserver};
pub use logging::{LogLevel, Logging, LoggingComponents};
pub use mantle_core::middleware::{FnMiddleware, from_fn};
pub use retry::Retry;

use mantle_core::{ChainFuture, Error, Response};

/// Future failing the call with `err`.
fn fail(err: Error) -> ChainFuture {
    Box::pin(std::future::ready(Err::<Response, _>(err)))
}
