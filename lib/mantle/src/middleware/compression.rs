//! Request body compression middleware.
//!
//! Compresses materialized request bodies into the deflate container produced
//! by [`crate::codec::deflate`] and sets `Content-Encoding: deflate`.

use std::fmt;
use std::sync::Arc;

use http::HeaderValue;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use mantle_core::{Body, ChainFuture, Configs, Error, Middleware, Next, Request};
use tracing::{debug, trace};

use crate::codec;

/// What to do when the request already carries a `Content-Encoding` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DuplicateHeaderBehavior {
    /// Fail the call with [`Error::DuplicateHeader`]; the transport is never called.
    Error,
    /// Compress anyway and overwrite the header.
    Replace,
    /// Forward the request unmodified.
    #[default]
    Skip,
}

type Predicate = dyn Fn(&[u8]) -> bool + Send + Sync;

/// Middleware that deflate-compresses request bodies.
///
/// A request is forwarded untouched when it has no body, when its body is
/// deferred, or when the predicate rejects the bytes. Otherwise the
/// [`DuplicateHeaderBehavior`] decides what happens to an existing
/// `Content-Encoding`.
#[derive(Clone)]
pub struct Compression {
    behavior: DuplicateHeaderBehavior,
    predicate: Arc<Predicate>,
}

impl Compression {
    /// Compress every body, resolving existing headers with `behavior`.
    #[must_use]
    pub fn new(behavior: DuplicateHeaderBehavior) -> Self {
        Self {
            behavior,
            predicate: Arc::new(|_: &[u8]| true),
        }
    }

    /// Only compress bodies the predicate accepts.
    ///
    /// # Example
    ///
    /// ```
    /// use mantle::middleware::{Compression, DuplicateHeaderBehavior};
    ///
    /// let large_only = Compression::new(DuplicateHeaderBehavior::Skip)
    ///     .with_predicate(|body| body.len() > 1024);
    /// # let _ = large_only;
    /// ```
    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.predicate = Arc::new(predicate);
        self
    }

    /// The duplicate header behavior.
    #[must_use]
    pub const fn behavior(&self) -> DuplicateHeaderBehavior {
        self.behavior
    }
}

impl Default for Compression {
    fn default() -> Self {
        Self::new(DuplicateHeaderBehavior::default())
    }
}

impl fmt::Debug for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compression")
            .field("behavior", &self.behavior)
            .finish_non_exhaustive()
    }
}

impl Middleware for Compression {
    fn intercept(
        &self,
        mut request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        let bytes = match &body {
            Some(Body::Bytes(bytes)) => bytes.clone(),
            Some(Body::Deferred(_)) | None => return next.run(request, body, configs),
        };

        if !(self.predicate)(&bytes) {
            return next.run(request, body, configs);
        }

        if request.headers().contains_key(CONTENT_ENCODING) {
            match self.behavior {
                DuplicateHeaderBehavior::Error => {
                    debug!(url = %request.url(), "content-encoding already set");
                    return super::fail(Error::duplicate_header(CONTENT_ENCODING));
                }
                DuplicateHeaderBehavior::Skip => return next.run(request, body, configs),
                DuplicateHeaderBehavior::Replace => {}
            }
        }

        let encoded = match codec::deflate(&bytes) {
            Ok(encoded) => encoded,
            Err(err) => return super::fail(Error::Compression(err)),
        };
        trace!(
            original = bytes.len(),
            compressed = encoded.len(),
            "request body compressed"
        );

        let headers = request.headers_mut();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("deflate"));
        headers.remove(CONTENT_LENGTH);

        next.run(request, Some(Body::Bytes(encoded)), configs)
    }
}
