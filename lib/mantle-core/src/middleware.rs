//! Middleware contract and chain execution.
//!
//! A [`Middleware`] intercepts a pending call. It receives the request, the
//! optional body, the effective [`Configs`] snapshot and a [`Next`]
//! continuation that runs everything registered after it, down to the
//! [`Transport`]. It may rewrite the request before calling `next`, inspect
//! or replace the response after, call `next` several times (retry), or not
//! call it at all (short-circuit).
//!
//! # Ordering
//!
//! Middleware wraps in registration order. The first registered is the
//! outermost: it sees the request first and the response last. The most
//! recently registered is the innermost, closest to the transport.
//!
//! ```text
//! Request  → M1 → M2 → Transport
//! Response ← M1 ← M2 ← Transport
//! ```

use std::fmt;
use std::sync::Arc;

use crate::transport::{ChainFuture, Transport};
use crate::{Body, Configs, Request};

/// A composable interceptor around a request/response exchange.
pub trait Middleware: Send + Sync + 'static {
    /// Intercept the call.
    ///
    /// Return `next.run(..)` to continue the chain, or any other future to
    /// short-circuit it. Errors from `next` that are not handled here must
    /// be returned unchanged.
    fn intercept(
        &self,
        request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn intercept(
        &self,
        request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        (**self).intercept(request, body, configs, next)
    }
}

type Continuation = dyn Fn(Request, Option<Body>, Configs) -> ChainFuture + Send + Sync;

/// Continuation representing everything after the current middleware.
///
/// Cloning is cheap; a middleware may run it any number of times.
#[derive(Clone)]
pub struct Next {
    continuation: Arc<Continuation>,
}

impl Next {
    fn new<F>(continuation: F) -> Self
    where
        F: Fn(Request, Option<Body>, Configs) -> ChainFuture + Send + Sync + 'static,
    {
        Self {
            continuation: Arc::new(continuation),
        }
    }

    /// Run the rest of the chain.
    #[must_use = "the rest of the chain only runs when the future is awaited"]
    pub fn run(&self, request: Request, body: Option<Body>, configs: Configs) -> ChainFuture {
        (self.continuation)(request, body, configs)
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").finish_non_exhaustive()
    }
}

/// Nested composition of middleware around a terminal transport call.
///
/// Built once per call by right-folding the registration-ordered middleware
/// over the transport: each link captures the continuation of the links
/// after it.
#[derive(Clone, Debug)]
pub struct MiddlewareChain {
    entry: Next,
}

impl MiddlewareChain {
    /// Compose `middleware` (in registration order) around `transport`.
    pub fn new<I>(middleware: I, transport: Arc<dyn Transport>) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
        I::IntoIter: DoubleEndedIterator,
    {
        let terminal = Next::new(move |request, body, configs| {
            transport.send(request, body, configs)
        });

        let entry = middleware
            .into_iter()
            .rev()
            .fold(terminal, |next, middleware| {
                Next::new(move |request, body, configs| {
                    middleware.intercept(request, body, configs, next.clone())
                })
            });

        Self { entry }
    }

    /// Execute the chain for one call.
    #[must_use = "the chain only runs when the future is awaited"]
    pub fn execute(&self, request: Request, body: Option<Body>, configs: Configs) -> ChainFuture {
        self.entry.run(request, body, configs)
    }
}

/// Persistent, append-only list of middleware.
///
/// Appending allocates one node and shares the whole parent list, so deriving
/// clients stays cheap however long the stack grows.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    head: Option<Arc<Node>>,
    len: usize,
}

struct Node {
    middleware: Arc<dyn Middleware>,
    parent: Option<Arc<Node>>,
}

impl MiddlewareStack {
    /// Create an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a stack with `middleware` appended (innermost).
    #[must_use]
    pub fn push(&self, middleware: Arc<dyn Middleware>) -> Self {
        Self {
            head: Some(Arc::new(Node {
                middleware,
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Number of middleware in the stack.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the stack is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Middleware in registration order (outermost first).
    #[must_use]
    pub fn to_vec(&self) -> Vec<Arc<dyn Middleware>> {
        let mut ordered = Vec::with_capacity(self.len);
        let mut cursor = self.head.as_ref();
        while let Some(node) = cursor {
            ordered.push(Arc::clone(&node.middleware));
            cursor = node.parent.as_ref();
        }
        ordered.reverse();
        ordered
    }

    /// Compose the stack around `transport`.
    #[must_use]
    pub fn chain(&self, transport: Arc<dyn Transport>) -> MiddlewareChain {
        MiddlewareChain::new(self.to_vec(), transport)
    }
}

impl fmt::Debug for MiddlewareStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareStack")
            .field("len", &self.len)
            .finish()
    }
}

/// Middleware backed by a closure, see [`from_fn`].
pub struct FnMiddleware<F> {
    f: F,
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, Option<Body>, Configs, Next) -> ChainFuture + Send + Sync + 'static,
{
    fn intercept(
        &self,
        request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        (self.f)(request, body, configs, next)
    }
}

/// Create a [`Middleware`] from a closure.
///
/// # Example
///
/// ```
/// use mantle_core::middleware;
/// use http::HeaderValue;
///
/// let tag = middleware::from_fn(|mut request, body, configs, next| {
///     request
///         .headers_mut()
///         .insert("x-client", HeaderValue::from_static("mantle"));
///     next.run(request, body, configs)
/// });
/// # let _ = tag;
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, Option<Body>, Configs, Next) -> ChainFuture + Send + Sync + 'static,
{
    FnMiddleware { f }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use bytes::Bytes;
    use http::{HeaderMap, HeaderValue, Method};

    use super::*;
    use crate::{Error, Response, transport};

    fn request() -> Request {
        Request::builder(
            Method::GET,
            url::Url::parse("https://example.com/pets").expect("valid url"),
        )
        .build()
    }

    /// Transport echoing the `x-trail` request header into the response body.
    fn echo_trail() -> Arc<dyn Transport> {
        Arc::new(transport::from_fn(|request: Request, _body, _configs| {
            let trail = request.header("x-trail").unwrap_or_default().to_string();
            Box::pin(async move { Ok(Response::new(200, HeaderMap::new(), Bytes::from(trail))) })
        }))
    }

    /// Appends `name` to `x-trail` on the way in and to `x-seen` on the way out.
    fn tagging(name: &'static str) -> Arc<dyn Middleware> {
        Arc::new(from_fn(move |mut request: Request, body, configs, next: Next| {
            let trail = match request.header("x-trail") {
                Some(trail) => format!("{trail},{name}"),
                None => name.to_string(),
            };
            let trail = HeaderValue::try_from(trail).expect("valid header");
            request.headers_mut().insert("x-trail", trail);
            let future = next.run(request, body, configs);
            Box::pin(async move {
                let mut response = future.await?;
                let seen = match response.header("x-seen") {
                    Some(seen) => format!("{seen},{name}"),
                    None => name.to_string(),
                };
                response
                    .headers_mut()
                    .insert("x-seen", HeaderValue::try_from(seen).expect("valid header"));
                Ok::<_, Error>(response)
            })
        }))
    }

    #[tokio::test]
    async fn first_registered_is_outermost() {
        let chain = MiddlewareChain::new(vec![tagging("m1"), tagging("m2")], echo_trail());

        let response = chain
            .execute(request(), None, Configs::new())
            .await
            .expect("response");

        assert_eq!(response.body().as_ref(), b"m1,m2");
        assert_eq!(response.header("x-seen"), Some("m2,m1"));
    }

    #[tokio::test]
    async fn empty_chain_calls_transport() {
        let chain = MiddlewareChain::new(Vec::new(), echo_trail());
        let response = chain
            .execute(request(), None, Configs::new())
            .await
            .expect("response");
        assert_eq!(response.status(), 200);
        assert!(response.body().is_empty());
    }

    #[tokio::test]
    async fn short_circuit_skips_transport() {
        let called = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&called);
        let transport: Arc<dyn Transport> =
            Arc::new(transport::from_fn(move |_request, _body, _configs| {
                *flag.lock().expect("lock") = true;
                Box::pin(async { Ok(Response::new(200, HeaderMap::new(), Bytes::new())) })
            }));
        let cached: Arc<dyn Middleware> = Arc::new(from_fn(|_request, _body, _configs, _next| {
            Box::pin(async {
                Ok(Response::new(
                    203,
                    HeaderMap::new(),
                    Bytes::from_static(b"cached"),
                ))
            })
        }));

        let response = MiddlewareChain::new(vec![cached], transport)
            .execute(request(), None, Configs::new())
            .await
            .expect("response");

        assert_eq!(response.status(), 203);
        assert!(!*called.lock().expect("lock"));
    }

    #[tokio::test]
    async fn errors_propagate_unchanged() {
        let failing: Arc<dyn Transport> = Arc::new(transport::from_fn(|_request, _body, _configs| {
            Box::pin(async { Err(Error::connection("connection reset")) })
        }));

        let err = MiddlewareChain::new(vec![tagging("m1"), tagging("m2")], failing)
            .execute(request(), None, Configs::new())
            .await
            .expect_err("transport failure");

        assert!(matches!(err, Error::Connection(ref msg) if msg == "connection reset"));
    }

    #[tokio::test]
    async fn next_can_run_more_than_once() {
        let twice: Arc<dyn Middleware> = Arc::new(from_fn(|request, body, configs, next: Next| {
            Box::pin(async move {
                let _first = next
                    .run(request.clone(), body.clone(), configs.clone())
                    .await?;
                next.run(request, body, configs).await
            })
        }));

        let response = MiddlewareChain::new(vec![twice, tagging("inner")], echo_trail())
            .execute(request(), None, Configs::new())
            .await
            .expect("response");

        // Each run starts from the original request, so tags never accumulate.
        assert_eq!(response.body().as_ref(), b"inner");
    }

    #[test]
    fn stack_push_shares_parent() {
        let parent = MiddlewareStack::new().push(tagging("a"));
        let left = parent.push(tagging("b"));
        let right = parent.push(tagging("c"));

        assert_eq!(parent.len(), 1);
        assert_eq!(left.len(), 2);
        assert_eq!(right.len(), 2);
        assert_eq!(parent.to_vec().len(), 1);
        assert!(MiddlewareStack::new().is_empty());
    }

    #[tokio::test]
    async fn stack_resolves_in_registration_order() {
        let stack = MiddlewareStack::new()
            .push(tagging("first"))
            .push(tagging("second"))
            .push(tagging("third"));

        let response = stack
            .chain(echo_trail())
            .execute(request(), None, Configs::new())
            .await
            .expect("response");

        assert_eq!(response.body().as_ref(), b"first,second,third");
    }
}
