//! Request bodies.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::Result;

type Producer = dyn Fn() -> Result<Bytes> + Send + Sync;

/// Request body passed next to the [`crate::Request`] through the chain.
///
/// A body is either already materialized bytes, or a deferred producer that
/// yields its bytes on demand (e.g. read from a file when the transport is
/// ready). Middleware that rewrites bodies, such as compression, only acts on
/// materialized bytes and forwards deferred bodies untouched.
///
/// Cloning is cheap in both cases, so retrying middleware can replay a body.
#[derive(Clone)]
pub enum Body {
    /// Materialized bytes.
    Bytes(Bytes),
    /// Bytes produced on demand.
    Deferred(Arc<Producer>),
}

impl Body {
    /// Create a deferred body from a producer.
    pub fn deferred<F>(producer: F) -> Self
    where
        F: Fn() -> Result<Bytes> + Send + Sync + 'static,
    {
        Self::Deferred(Arc::new(producer))
    }

    /// The bytes, if the body is materialized.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::Deferred(_) => None,
        }
    }

    /// Returns `true` if the body is materialized.
    #[must_use]
    pub const fn is_materialized(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }

    /// Produce the body bytes, running the producer for deferred bodies.
    pub fn materialize(&self) -> Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.clone()),
            Self::Deferred(producer) => producer(),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Deferred(_) => f.write_str("Deferred"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Self::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Bytes(Bytes::from(text))
    }
}
