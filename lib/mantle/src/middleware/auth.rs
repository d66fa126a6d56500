//! Authentication middleware.
//!
//! Adds an `Authorization: Bearer <token>`, `Authorization: Basic <base64>`
//! or custom API-key header to outgoing requests. The header is only added
//! while [`ConfigsExt::auth_enabled`] is `true`, which lets a derived client
//! opt out of credentials registered on its parent:
//!
//! ```
//! use mantle::middleware::Credentials;
//!
//! let api = mantle::Client::hyper("https://petstore.example/v2")?
//!     .auth(Credentials::bearer("my-secret-token"));
//!
//! // Same middleware stack, no Authorization header.
//! let public = api.scoped("store").auth_enabled(false);
//! # let _ = public;
//! # Ok::<(), mantle::Error>(())
//! ```

use std::fmt;

#[cfg(feature = "middleware-basic-auth")]
use base64::Engine;
use http::header::AUTHORIZATION;
use http::{HeaderName, HeaderValue};
use mantle_core::{Body, ChainFuture, Configs, Error, Middleware, Next, Request};

use crate::configs::ConfigsExt;

/// Credentials attached by [`Auth`].
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// `Authorization: Basic <base64(username:password)>`.
    #[cfg(feature = "middleware-basic-auth")]
    Basic {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
    /// `<header>: <value>`.
    ApiKey {
        /// Header name, e.g. `x-api-key`.
        header: String,
        /// Key value.
        value: String,
    },
}

impl Credentials {
    /// Bearer token credentials.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    /// Basic credentials.
    #[cfg(feature = "middleware-basic-auth")]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// API key sent in a custom header.
    pub fn api_key(header: impl Into<String>, value: impl Into<String>) -> Self {
        Self::ApiKey {
            header: header.into(),
            value: value.into(),
        }
    }

    fn to_header(&self) -> Result<(HeaderName, HeaderValue), String> {
        let (name, value) = match self {
            Self::Bearer(token) => (AUTHORIZATION, format!("Bearer {token}")),
            #[cfg(feature = "middleware-basic-auth")]
            Self::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{username}:{password}"));
                (AUTHORIZATION, format!("Basic {encoded}"))
            }
            Self::ApiKey { header, value } => {
                let name = HeaderName::try_from(header.as_str())
                    .map_err(|e| format!("invalid auth header name '{header}': {e}"))?;
                (name, value.clone())
            }
        };

        let mut value = HeaderValue::try_from(value)
            .map_err(|e| format!("invalid {name} credentials: {e}"))?;
        value.set_sensitive(true);
        Ok((name, value))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            #[cfg(feature = "middleware-basic-auth")]
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::ApiKey { header, .. } => f
                .debug_struct("ApiKey")
                .field("header", header)
                .finish_non_exhaustive(),
        }
    }
}

/// Middleware that adds credentials to requests.
///
/// Invalid credentials (e.g. a token containing a newline) fail each call
/// with [`Error::InvalidRequest`] before anything reaches the transport.
#[derive(Clone)]
pub struct Auth {
    header: Result<(HeaderName, HeaderValue), String>,
}

impl Auth {
    /// Create a new auth middleware with the given credentials.
    #[must_use]
    pub fn new(credentials: &Credentials) -> Self {
        Self {
            header: credentials.to_header(),
        }
    }
}

impl From<Credentials> for Auth {
    fn from(credentials: Credentials) -> Self {
        Self::new(&credentials)
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header.as_ref().map(|(name, _)| name);
        f.debug_struct("Auth").field("header", &header).finish()
    }
}

impl Middleware for Auth {
    fn intercept(
        &self,
        mut request: Request,
        body: Option<Body>,
        configs: Configs,
        next: Next,
    ) -> ChainFuture {
        if !configs.auth_enabled() {
            return next.run(request, body, configs);
        }

        match &self.header {
            Ok((name, value)) => {
                request.headers_mut().insert(name.clone(), value.clone());
                next.run(request, body, configs)
            }
            Err(message) => super::fail(Error::invalid_request(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use http::{HeaderMap, Method};
    use mantle_core::{MiddlewareChain, Response, Transport, transport};

    use super::*;
    use crate::configs::AUTH_ENABLED;

    /// Transport recording the request it receives.
    fn recording() -> (Arc<dyn Transport>, Arc<Mutex<Option<Request>>>) {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let transport = transport::from_fn(move |request: Request, _body, _configs| {
            *sink.lock().expect("lock") = Some(request);
            Box::pin(async { Ok(Response::new(200, HeaderMap::new(), Bytes::new())) })
        });
        (Arc::new(transport), seen)
    }

    async fn send(auth: Auth, configs: Configs) -> mantle_core::Result<Request> {
        let (transport, seen) = recording();
        let request = Request::builder(
            Method::GET,
            url::Url::parse("https://petstore.example/pets").expect("valid url"),
        )
        .build();
        MiddlewareChain::new(vec![Arc::new(auth) as Arc<dyn Middleware>], transport)
            .execute(request, None, configs)
            .await?;
        let request = seen.lock().expect("lock").take().expect("transport called");
        Ok(request)
    }

    #[tokio::test]
    async fn bearer_header_is_added() {
        let request = send(Credentials::bearer("test-token").into(), Configs::new())
            .await
            .expect("call");
        assert_eq!(request.header("authorization"), Some("Bearer test-token"));
        assert!(request.headers()[AUTHORIZATION].is_sensitive());
    }

    #[cfg(feature = "middleware-basic-auth")]
    #[tokio::test]
    async fn basic_header_is_encoded() {
        // "user:pass" -> "dXNlcjpwYXNz"
        let request = send(Credentials::basic("user", "pass").into(), Configs::new())
            .await
            .expect("call");
        assert_eq!(request.header("authorization"), Some("Basic dXNlcjpwYXNz"));
    }

    #[tokio::test]
    async fn api_key_uses_custom_header() {
        let credentials = Credentials::api_key("x-api-key", "k-123");
        let request = send(credentials.into(), Configs::new())
            .await
            .expect("call");
        assert_eq!(request.header("x-api-key"), Some("k-123"));
        assert_eq!(request.header("authorization"), None);
    }

    #[tokio::test]
    async fn disabled_auth_leaves_request_untouched() {
        let configs = Configs::new().with(&AUTH_ENABLED, false);
        let request = send(Credentials::bearer("test-token").into(), configs)
            .await
            .expect("call");
        assert_eq!(request.header("authorization"), None);
    }

    #[tokio::test]
    async fn invalid_token_fails_the_call() {
        let err = send(Credentials::bearer("bad\ntoken").into(), Configs::new())
            .await
            .expect_err("invalid header value");
        assert!(matches!(err, Error::InvalidRequest(_)));
    }

    #[test]
    fn debug_redacts_secrets() {
        let debug = format!("{:?}", Credentials::bearer("s3cr3t"));
        assert!(!debug.contains("s3cr3t"));
    }
}
