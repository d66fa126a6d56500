//! Per-call request description.

use http::{HeaderMap, HeaderName, HeaderValue, Method};
use mantle_core::{Body, Error, to_query_pairs, to_value};
use serde::Serialize;
use serde_json::Value;

/// Body of an [`Endpoint`].
#[derive(Debug, Clone)]
pub(crate) enum EndpointBody {
    /// Encoded at call time with the client's body encoder.
    Encodable(Value),
    /// Sent as-is.
    Raw(Body),
}

/// What a single call adds to the client's request template.
///
/// The path is appended to the client's base path; headers override the
/// client's default headers of the same name; query parameters are appended.
///
/// ```
/// use mantle::Endpoint;
///
/// #[derive(serde::Serialize)]
/// struct NewPet<'a> {
///     name: &'a str,
/// }
///
/// let endpoint = Endpoint::post("pets")
///     .query("dry_run", "true")
///     .body(&NewPet { name: "Rex" });
/// # let _ = endpoint;
/// ```
#[derive(Debug)]
pub struct Endpoint {
    pub(crate) method: Method,
    pub(crate) path: Vec<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) body: Option<EndpointBody>,
    pub(crate) error: Option<Error>,
}

impl Endpoint {
    /// Endpoint at `path` (relative to the client base path) with `method`.
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: split_path(path),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            error: None,
        }
    }

    /// `GET` endpoint.
    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    /// `POST` endpoint.
    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    /// `PUT` endpoint.
    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    /// `PATCH` endpoint.
    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// `DELETE` endpoint.
    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// The HTTP method.
    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Path segments appended to the base path.
    #[must_use]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Append a header.
    ///
    /// Repeated names keep every value. Together they replace the client
    /// default of the same name.
    ///
    /// Invalid names or values fail the call with [`Error::InvalidRequest`].
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => self.record(Error::invalid_request(format!("invalid header: {name}"))),
        }
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, name: &str, value: impl ToString) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Append query parameters from a serializable struct.
    ///
    /// `None` fields are skipped.
    #[must_use]
    pub fn query_params<T: Serialize + ?Sized>(mut self, params: &T) -> Self {
        match to_query_pairs(params) {
            Ok(pairs) => self.query.extend(pairs),
            Err(err) => self.record(err),
        }
        self
    }

    /// Send `value` encoded with the client's body encoder.
    ///
    /// Serialization errors fail the call with [`Error::Encode`].
    #[must_use]
    pub fn body<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match to_value(value) {
            Ok(value) => self.body = Some(EndpointBody::Encodable(value)),
            Err(err) => self.record(err),
        }
        self
    }

    /// Send `body` unchanged.
    #[must_use]
    pub fn raw_body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(EndpointBody::Raw(body.into()));
        self
    }

    fn record(&mut self, err: Error) {
        self.error.get_or_insert(err);
    }
}

pub(crate) fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
