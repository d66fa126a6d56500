//! HTTP request descriptor.
//!
//! A [`Request`] carries the method, URL (path and query) and headers of an
//! outgoing call. The body travels next to it through the middleware chain,
//! see [`crate::Body`].
//!
//! # Example
//!
//! ```
//! use mantle_core::Request;
//! use http::Method;
//!
//! let request = Request::builder(Method::GET, "https://api.example.com/pets".parse().unwrap())
//!     .header("accept", "application/json")
//!     .query("status", "available")
//!     .build();
//!
//! assert_eq!(request.url().as_str(), "https://api.example.com/pets?status=available");
//! assert_eq!(request.header("Accept"), Some("application/json"));
//! ```

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::Method;
use url::Url;

/// An HTTP request descriptor: method, URL and headers.
///
/// Headers are a case-insensitive, ordered multimap. Values are immutable
/// once built; middleware that rewrites a request takes it by value and
/// passes the modified copy to the next link.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl Request {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: Url) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL, including the query string.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Mutable access to the URL.
    #[must_use]
    pub fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// First value of a header, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Decoded query parameters, in order.
    #[must_use]
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect()
    }

    /// Consume into (method, url, headers).
    #[must_use]
    pub fn into_parts(self) -> (Method, Url, HeaderMap) {
        (self.method, self.url, self.headers)
    }

    /// Rebuild a request from its parts.
    #[must_use]
    pub fn from_parts(method: Method, url: Url, headers: HeaderMap) -> Self {
        Self {
            method,
            url,
            headers,
        }
    }
}

/// Builder for constructing [`Request`] instances.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: Method,
    url: Url,
    headers: HeaderMap,
    invalid: Vec<String>,
}

impl RequestBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            invalid: Vec::new(),
        }
    }

    /// Sets a header, replacing previous values with the same name.
    ///
    /// Invalid names or values are reported by [`RequestBuilder::try_build`]
    /// and skipped by [`RequestBuilder::build`].
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::try_from(name),
            HeaderValue::try_from(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            _ => self.invalid.push(name.to_string()),
        }
        self
    }

    /// Appends all headers from `headers`, keeping existing values.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in &headers {
            self.headers.append(name, value.clone());
        }
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Appends multiple query parameters to the URL.
    #[must_use]
    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut pairs = pairs.into_iter().peekable();
        if pairs.peek().is_some() {
            let mut query = self.url.query_pairs_mut();
            for (name, value) in pairs {
                query.append_pair(&name, &value);
            }
        }
        self
    }

    /// Builds the [`Request`], skipping invalid headers.
    #[must_use]
    pub fn build(self) -> Request {
        Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
        }
    }

    /// Builds the [`Request`], failing on the first invalid header.
    pub fn try_build(self) -> crate::Result<Request> {
        if let Some(name) = self.invalid.first() {
            return Err(crate::Error::invalid_request(format!(
                "invalid header: {name}"
            )));
        }
        Ok(self.build())
    }
}
