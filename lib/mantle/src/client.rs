//! The composition root: an immutable, derivable HTTP client.

use std::any::Any;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderName, HeaderValue};
use mantle_core::{
    Body, ConfigKey, Configs, ContentEncoder, DataDecoder, Error, Middleware, MiddlewareStack,
    Request, Response, Result, Transport,
};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::coders::UnwrapField;
use crate::configs::{
    AUTH_ENABLED, BODY_DECODER, BODY_ENCODER, ConfigsExt, LOG_LEVEL, LOGGING_COMPONENTS,
    VALID_STATUS,
};
use crate::endpoint::{Endpoint, EndpointBody, split_path};
use crate::middleware::{
    Auth, BackgroundObserver, Credentials, LogLevel, Logging, LoggingComponents, Retry,
    RetryOnForeground,
};
#[cfg(feature = "middleware-compression")]
use crate::middleware::{Compression, DuplicateHeaderBehavior};
use crate::shape::{Decodable, Raw, ResponseShape, Void};
use crate::transport::HyperTransport;

/// Immutable HTTP client.
///
/// A client holds a request template (base URL and default headers), a
/// [`Configs`] snapshot, an ordered middleware stack and a shared
/// [`Transport`]. Every builder-style method returns a *new* client and
/// leaves `self` untouched, so a base client can be specialized freely:
///
/// ```
/// use mantle::Client;
/// use mantle::middleware::Credentials;
///
/// let petstore = Client::hyper("https://petstore.example/v2")?
///     .auth(Credentials::bearer("my-token"))
///     .with_retry(2);
///
/// let pets = petstore.scoped("pet");
/// let store = petstore.scoped("store").auth_enabled(false);
/// # let _ = (pets, store);
/// # Ok::<(), mantle::Error>(())
/// ```
///
/// Middleware is applied in registration order: the first registered is the
/// outermost, the most recently registered is closest to the transport.
/// Cloning and deriving only bump reference counts.
#[derive(Clone)]
pub struct Client {
    base_url: Arc<Url>,
    headers: Arc<HeaderMap>,
    configs: Configs,
    middleware: MiddlewareStack,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url.as_str())
            .field("headers", &self.headers.len())
            .field("configs", &self.configs)
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    // ========================================================================
    // Construction
    // ========================================================================

    /// Create a client for `base_url` sending through `transport`.
    pub fn new(base_url: &str, transport: impl Transport) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::invalid_request(format!(
                "base URL cannot have a path: {base_url}"
            )));
        }

        Ok(Self {
            base_url: Arc::new(base_url),
            headers: Arc::default(),
            configs: Configs::new(),
            middleware: MiddlewareStack::new(),
            transport: Arc::new(transport),
        })
    }

    /// Create a client for `base_url` with the default [`HyperTransport`].
    pub fn hyper(base_url: &str) -> Result<Self> {
        Self::new(base_url, HyperTransport::new())
    }

    /// Derive a client sending through another transport.
    #[must_use]
    pub fn with_transport(&self, transport: impl Transport) -> Self {
        Self {
            transport: Arc::new(transport),
            ..self.clone()
        }
    }

    // ========================================================================
    // Request template
    // ========================================================================

    /// The base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Derive a client whose base path is extended with `segment`.
    ///
    /// `segment` may contain several `/`-separated segments.
    #[must_use]
    pub fn scoped(&self, segment: &str) -> Self {
        self.path(split_path(segment))
    }

    /// Derive a client whose base path is extended with `segments`.
    #[must_use]
    pub fn path<I>(&self, segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut base_url = (*self.base_url).clone();
        append_segments(&mut base_url, segments);
        Self {
            base_url: Arc::new(base_url),
            ..self.clone()
        }
    }

    /// Derive a client sending `name: value` on every request.
    #[must_use]
    pub fn header(&self, name: HeaderName, value: HeaderValue) -> Self {
        let mut headers = (*self.headers).clone();
        headers.insert(name, value);
        Self {
            headers: Arc::new(headers),
            ..self.clone()
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// The configuration snapshot calls of this client run with.
    #[must_use]
    pub const fn configs_snapshot(&self) -> &Configs {
        &self.configs
    }

    /// Value of `key` in this client's configuration.
    #[must_use]
    pub fn config<V>(&self, key: &ConfigKey<V>) -> Option<&V>
    where
        V: Any + Send + Sync,
    {
        self.configs.get(key)
    }

    /// Derive a client with a modified configuration.
    ///
    /// ```
    /// use mantle::{Client, ConfigKey};
    ///
    /// static TENANT: ConfigKey<String> = ConfigKey::new("tenant");
    ///
    /// let base = Client::hyper("https://api.example.com")?;
    /// let acme = base.configs(|configs| configs.insert(&TENANT, "acme".to_string()));
    ///
    /// assert_eq!(acme.config(&TENANT).map(String::as_str), Some("acme"));
    /// assert_eq!(base.config(&TENANT), None);
    /// # Ok::<(), mantle::Error>(())
    /// ```
    #[must_use]
    pub fn configs(&self, mutator: impl FnOnce(&mut Configs)) -> Self {
        let mut configs = self.configs.clone();
        mutator(&mut configs);
        Self {
            configs,
            ..self.clone()
        }
    }

    /// Derive a client where `key` maps to `value`.
    #[must_use]
    pub fn with_config<V>(&self, key: &ConfigKey<V>, value: V) -> Self
    where
        V: Any + Send + Sync,
    {
        Self {
            configs: self.configs.with(key, value),
            ..self.clone()
        }
    }

    /// Derive a client encoding request bodies with `encoder`.
    #[must_use]
    pub fn body_encoder(&self, encoder: impl ContentEncoder + 'static) -> Self {
        let encoder: Arc<dyn ContentEncoder> = Arc::new(encoder);
        self.with_config(&BODY_ENCODER, encoder)
    }

    /// Derive a client decoding response bodies with `decoder`.
    #[must_use]
    pub fn body_decoder(&self, decoder: impl DataDecoder + 'static) -> Self {
        let decoder: Arc<dyn DataDecoder> = Arc::new(decoder);
        self.with_config(&BODY_DECODER, decoder)
    }

    /// Derive a client whose decoder is `mapper` applied to the current one.
    #[must_use]
    pub fn map_decoder<F>(&self, mapper: F) -> Self
    where
        F: FnOnce(Arc<dyn DataDecoder>) -> Arc<dyn DataDecoder>,
    {
        self.configs(|configs| {
            let decoder = mapper(configs.body_decoder());
            configs.insert(&BODY_DECODER, decoder);
        })
    }

    /// Derive a client reading response payloads from the `field` of an envelope.
    #[must_use]
    pub fn unwrap_response(&self, field: impl Into<String>) -> Self {
        let field = field.into();
        self.map_decoder(move |decoder| Arc::new(UnwrapField::new(decoder, field)))
    }

    /// Derive a client accepting `range` as successful statuses.
    #[must_use]
    pub fn valid_status(&self, range: Range<u16>) -> Self {
        self.with_config(&VALID_STATUS, range)
    }

    /// Derive a client with auth middleware enabled or disabled.
    #[must_use]
    pub fn auth_enabled(&self, enabled: bool) -> Self {
        self.with_config(&AUTH_ENABLED, enabled)
    }

    /// Derive a client logging at `level`.
    #[must_use]
    pub fn log_level(&self, level: LogLevel) -> Self {
        self.with_config(&LOG_LEVEL, level)
    }

    /// Derive a client logging `components`.
    #[must_use]
    pub fn logging_components(&self, components: LoggingComponents) -> Self {
        self.with_config(&LOGGING_COMPONENTS, components)
    }

    // ========================================================================
    // Middleware
    // ========================================================================

    /// Derive a client with `middleware` appended, closest to the transport.
    #[must_use]
    pub fn layer(&self, middleware: impl Middleware) -> Self {
        let middleware: Arc<dyn Middleware> = Arc::new(middleware);
        Self {
            middleware: self.middleware.push(middleware),
            ..self.clone()
        }
    }

    /// Add credentials to every request, see [`Auth`].
    #[must_use]
    pub fn auth(&self, credentials: Credentials) -> Self {
        self.layer(Auth::from(credentials))
    }

    /// Add request/response logging, see [`Logging`].
    #[must_use]
    pub fn with_logging(&self) -> Self {
        self.layer(Logging::new())
    }

    /// Retry 5xx, 429 and transport errors up to `max_retries` times, see [`Retry`].
    #[must_use]
    pub fn with_retry(&self, max_retries: u32) -> Self {
        self.layer(Retry::new(max_retries))
    }

    /// Deflate-compress request bodies, see [`Compression`].
    #[cfg(feature = "middleware-compression")]
    #[must_use]
    pub fn compress_request(&self, behavior: DuplicateHeaderBehavior) -> Self {
        self.layer(Compression::new(behavior))
    }

    /// Deflate-compress the request bodies `predicate` accepts.
    #[cfg(feature = "middleware-compression")]
    #[must_use]
    pub fn compress_request_if<F>(&self, behavior: DuplicateHeaderBehavior, predicate: F) -> Self
    where
        F: Fn(&[u8]) -> bool + Send + Sync + 'static,
    {
        self.layer(Compression::new(behavior).with_predicate(predicate))
    }

    /// Retry calls interrupted by the host going to the background.
    ///
    /// `observer` is called once per call. `limit` bounds the retries of one
    /// call; `None` retries as long as attempts keep being interrupted.
    #[must_use]
    pub fn retry_when_foreground<F, O>(&self, limit: Option<u32>, observer: F) -> Self
    where
        F: Fn() -> O + Send + Sync + 'static,
        O: BackgroundObserver,
    {
        self.layer(RetryOnForeground::new(limit, observer))
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Perform `endpoint` and map the response with `shape`.
    ///
    /// The middleware chain runs once with this client's configuration; the
    /// shape then maps its response. Errors from middleware or the transport
    /// are returned unchanged.
    pub async fn call<S: ResponseShape>(&self, endpoint: Endpoint, shape: S) -> Result<S::Output> {
        let (request, body) = self.prepare(endpoint)?;
        debug!(method = %request.method(), url = %request.url(), "calling");

        let response = self
            .middleware
            .chain(Arc::clone(&self.transport))
            .execute(request, body, self.configs.clone())
            .await?;

        shape.decode(response, &self.configs)
    }

    /// Perform `endpoint` and decode the body into `T`.
    pub async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T> {
        self.call(endpoint, Decodable::<T>::new()).await
    }

    /// Perform `endpoint`, checking the status only.
    pub async fn send(&self, endpoint: Endpoint) -> Result<()> {
        self.call(endpoint, Void).await
    }

    /// Perform `endpoint` and return the raw response, whatever its status.
    pub async fn raw(&self, endpoint: Endpoint) -> Result<Response> {
        self.call(endpoint, Raw).await
    }

    /// Build the request and body of `endpoint` from the template.
    fn prepare(&self, endpoint: Endpoint) -> Result<(Request, Option<Body>)> {
        let Endpoint {
            method,
            path,
            headers: endpoint_headers,
            query,
            body,
            error,
        } = endpoint;
        if let Some(err) = error {
            return Err(err);
        }

        let mut url = (*self.base_url).clone();
        append_segments(&mut url, path);

        let mut headers = (*self.headers).clone();
        for name in endpoint_headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &endpoint_headers {
            headers.append(name, value.clone());
        }

        let body = match body {
            None => None,
            Some(EndpointBody::Raw(body)) => Some(body),
            Some(EndpointBody::Encodable(value)) => {
                let encoder = self.configs.body_encoder();
                let bytes = encoder.encode(&value)?;
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, encoder.content_type());
                }
                Some(Body::Bytes(bytes))
            }
        };

        let request = Request::builder(method, url)
            .headers(headers)
            .query_pairs(query)
            .build();
        Ok((request, body))
    }
}

fn append_segments<I>(url: &mut Url, segments: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    // Only fails for cannot-be-a-base URLs, rejected by `Client::new`.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
}
