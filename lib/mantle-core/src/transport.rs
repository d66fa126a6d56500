//! Transport contract.
//!
//! The [`Transport`] performs the actual network exchange at the end of the
//! middleware chain. mantle treats it as a black box: it receives the final
//! request, body and configuration snapshot, and returns raw status, headers
//! and bytes, or a transport error.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;

use crate::{Body, Configs, Request, Response, Result};

/// Boxed future returned by transports and middleware.
pub type ChainFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Terminal call of every middleware chain.
///
/// Implementations should map their failures to the transport kinds of
/// [`crate::Error`] (`Connection`, `Tls`, `Timeout`).
///
/// # Example
///
/// ```
/// use mantle_core::{Body, Configs, Request, Response, Transport, transport};
///
/// let echo = transport::from_fn(|request: Request, body: Option<Body>, _configs: Configs| {
///     Box::pin(async move {
///         let bytes = body.map(|b| b.materialize()).transpose()?.unwrap_or_default();
///         Ok::<_, mantle_core::Error>(Response::new(200, request.headers().clone(), bytes))
///     })
/// });
/// # let _ = echo;
/// ```
pub trait Transport: Send + Sync + 'static {
    /// Send the request and return the raw response.
    fn send(&self, request: Request, body: Option<Body>, configs: Configs) -> ChainFuture;
}

/// Transport backed by a closure, see [`from_fn`].
pub struct FnTransport<F> {
    f: F,
}

impl<F> fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransport").finish_non_exhaustive()
    }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(Request, Option<Body>, Configs) -> ChainFuture + Send + Sync + 'static,
{
    fn send(&self, request: Request, body: Option<Body>, configs: Configs) -> ChainFuture {
        (self.f)(request, body, configs)
    }
}

/// Create a [`Transport`] from a closure.
///
/// Handy for tests and for adapting another HTTP stack.
pub fn from_fn<F>(f: F) -> FnTransport<F>
where
    F: Fn(Request, Option<Body>, Configs) -> ChainFuture + Send + Sync + 'static,
{
    FnTransport { f }
}
