//! Decoder adapters used by [`crate::Client::map_decoder`].

use std::sync::Arc;

use mantle_core::{DataDecoder, Error, Result};
use serde_json::Value;

/// Decoder reading the payload from one field of an envelope object.
///
/// For an API answering `{"data": {...}, "meta": {...}}`, wrapping the JSON
/// decoder with `UnwrapField::new(json, "data")` makes every shape see the
/// inner object only.
#[derive(Debug, Clone)]
pub struct UnwrapField {
    inner: Arc<dyn DataDecoder>,
    field: String,
}

impl UnwrapField {
    /// Wrap `inner`, keeping only `field` of its output.
    pub fn new(inner: Arc<dyn DataDecoder>, field: impl Into<String>) -> Self {
        Self {
            inner,
            field: field.into(),
        }
    }
}

impl DataDecoder for UnwrapField {
    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        let mut envelope = self.inner.decode(bytes)?;
        envelope
            .get_mut(&self.field)
            .map(Value::take)
            .ok_or_else(|| Error::decode(self.field.clone(), "missing envelope field"))
    }
}
