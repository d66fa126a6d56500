//! Body encoders and decoders.
//!
//! Typed values cross the wire in two steps: `serde` maps them to and from a
//! [`serde_json::Value`], and a [`ContentEncoder`] / [`DataDecoder`] maps that
//! value to and from bytes. The coder step is configurable per client, the
//! typed step is not.

use std::fmt;

use bytes::Bytes;
use http::HeaderValue;
use serde_json::Value;

use crate::{Error, Result};

/// Content type for request bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    /// JSON content type (`application/json`).
    Json,
    /// Form URL-encoded content type (`application/x-www-form-urlencoded`).
    FormUrlEncoded,
    /// Plain text content type (`text/plain`).
    PlainText,
    /// Binary content type (`application/octet-stream`).
    OctetStream,
}

impl ContentType {
    /// Get the MIME type string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::FormUrlEncoded => "application/x-www-form-urlencoded",
            Self::PlainText => "text/plain",
            Self::OctetStream => "application/octet-stream",
        }
    }

    /// Header value for this content type.
    #[must_use]
    pub const fn header_value(&self) -> HeaderValue {
        HeaderValue::from_static(self.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Turns an encodable value into request body bytes.
pub trait ContentEncoder: fmt::Debug + Send + Sync {
    /// `Content-Type` to send along with the encoded body.
    fn content_type(&self) -> HeaderValue;

    /// Encode the value.
    fn encode(&self, value: &Value) -> Result<Bytes>;
}

/// Turns response body bytes into a value the caller's type is read from.
pub trait DataDecoder: fmt::Debug + Send + Sync {
    /// Decode the bytes.
    fn decode(&self, bytes: &[u8]) -> Result<Value>;
}

/// JSON body encoder, the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl ContentEncoder for JsonEncoder {
    fn content_type(&self) -> HeaderValue {
        ContentType::Json.header_value()
    }

    fn encode(&self, value: &Value) -> Result<Bytes> {
        to_json(value)
    }
}

/// Form URL-encoded body encoder.
///
/// Only flat objects can be encoded; nested objects are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormEncoder;

impl ContentEncoder for FormEncoder {
    fn content_type(&self) -> HeaderValue {
        ContentType::FormUrlEncoded.header_value()
    }

    fn encode(&self, value: &Value) -> Result<Bytes> {
        to_form(value)
    }
}

/// JSON body decoder, the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl DataDecoder for JsonDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Value> {
        serde_json::from_slice(bytes).map_err(|e| Error::decode("", e.to_string()))
    }
}

/// Serialize a typed value into the intermediate representation.
pub fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::encode(e.to_string()))
}

/// Deserialize a typed value from the intermediate representation.
///
/// Errors carry the path of the failing field.
pub fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> Result<T> {
    serde_path_to_error::deserialize(value)
        .map_err(|e| Error::decode(e.path().to_string(), e.inner().to_string()))
}

/// Serialize a value to JSON bytes.
///
/// # Example
///
/// ```
/// use mantle_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Pet { name: String }
///
/// let pet = Pet { name: "Rex".to_string() };
/// let bytes = to_json(&pet).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Rex"}"#);
/// ```
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|e| Error::encode(e.to_string()))
}

/// Serialize a value to form URL-encoded bytes.
///
/// Uses `serde_html_form`, so sequences become repeated fields
/// (`tags=a&tags=b`).
pub fn to_form<T: serde::Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_html_form::to_string(value)
        .map(|s| Bytes::from(s.into_bytes()))
        .map_err(|e| Error::encode(e.to_string()))
}

/// Serialize a value to query string pairs.
pub fn to_query_pairs<T: serde::Serialize + ?Sized>(value: &T) -> Result<Vec<(String, String)>> {
    let query = serde_html_form::to_string(value).map_err(|e| Error::encode(e.to_string()))?;
    Ok(url::form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect())
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Example
///
/// ```
/// use mantle_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct Pet { name: String }
///
/// let pet: Pet = from_json(br#"{"name":"Rex"}"#).expect("deserialize");
/// assert_eq!(pet, Pet { name: "Rex".to_string() });
/// ```
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|e| Error::decode(e.path().to_string(), e.inner().to_string()))
}
