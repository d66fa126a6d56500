//! Hyper-based [`Transport`] implementation.
//!
//! [`HyperTransport`] sends the final request of a middleware chain with the
//! hyper-util legacy client: connection pooling, rustls TLS, HTTP/1.1 and
//! HTTP/2. Tower layers can be stacked around the raw exchange with
//! [`HyperTransportBuilder::layer`].

mod config;
mod connector;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{self, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use mantle_core::{Body, ChainFuture, Configs, Error, Request, Response, Result, Transport};
use tower::Layer;
use tower::limit::ConcurrencyLimitLayer;
use tower::util::BoxCloneService;
use tower_service::Service;
use tracing::trace;

pub use self::config::{TransportConfig, TransportConfigBuilder};
pub use self::connector::https_connector;
pub use mantle_core::transport::{FnTransport, from_fn};

/// Type-erased service performing one HTTP exchange.
pub type BoxedService = BoxCloneService<http::Request<Bytes>, Response<Bytes>, Error>;

/// Future type for the Tower Service implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// Thread-safe wrapper for `BoxedService`.
///
/// `BoxCloneService` is `Send` but not `Sync`; the mutex is only held to
/// clone the service.
#[derive(Clone)]
struct SyncService {
    inner: Arc<Mutex<BoxedService>>,
}

impl SyncService {
    fn new(service: BoxedService) -> Self {
        Self {
            inner: Arc::new(Mutex::new(service)),
        }
    }

    fn call(&self, request: http::Request<Bytes>) -> ServiceFuture {
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move {
            std::future::poll_fn(|cx| service.poll_ready(cx)).await?;
            service.call(request).await
        })
    }
}

/// The hyper client, without any layer.
#[derive(Clone)]
struct RawHyperTransport {
    inner: legacy::Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
    config: TransportConfig,
}

impl RawHyperTransport {
    fn new(config: TransportConfig) -> Self {
        let inner = legacy::Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(&config));

        Self { inner, config }
    }

    async fn execute(&self, request: http::Request<Bytes>) -> Result<Response<Bytes>> {
        let request = request.map(Full::new);

        // The timeout covers the whole exchange, body included.
        let exchange = async {
            let response = self
                .inner
                .request(request)
                .await
                .map_err(Self::map_hyper_error)?;
            let (parts, body) = response.into_parts();
            let body = body
                .collect()
                .await
                .map_err(|e| Error::connection(e.to_string()))?
                .to_bytes();
            Ok::<_, Error>(Response::new(parts.status.as_u16(), parts.headers, body))
        };

        tokio::time::timeout(self.config.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout)?
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: legacy::Error) -> Error {
        let msg = match std::error::Error::source(&err) {
            Some(source) => format!("{err}: {source}"),
            None => err.to_string(),
        };
        let lower = msg.to_lowercase();

        if lower.contains("ssl") || lower.contains("tls") || lower.contains("certificate") {
            return Error::tls(msg);
        }
        if lower.contains("timed out") {
            return Error::Timeout;
        }

        Error::connection(msg)
    }
}

impl Service<http::Request<Bytes>> for RawHyperTransport {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: http::Request<Bytes>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.execute(request).await })
    }
}

/// Build the `http::Request` sent by hyper.
fn to_http_request(request: Request, body: Bytes) -> Result<http::Request<Bytes>> {
    let (method, url, headers) = request.into_parts();

    let mut http_request = http::Request::builder()
        .method(method)
        .uri(url.as_str())
        .body(body)
        .map_err(|e| Error::invalid_request(e.to_string()))?;
    *http_request.headers_mut() = headers;

    Ok(http_request)
}

/// [`Transport`] backed by hyper-util with connection pooling and TLS.
///
/// # Example
///
/// ```
/// use mantle::{Client, HyperTransport};
/// use std::time::Duration;
///
/// let transport = HyperTransport::builder()
///     .timeout(Duration::from_secs(10))
///     .concurrency_limit(16)
///     .build();
///
/// let client = Client::new("https://api.example.com", transport)?;
/// # let _ = client;
/// # Ok::<(), mantle::Error>(())
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    service: SyncService,
    config: TransportConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a transport with a custom configuration.
    #[must_use]
    pub fn with_config(config: TransportConfig) -> Self {
        HyperTransportBuilder {
            config,
            layers: Vec::new(),
        }
        .build()
    }

    /// Create a new transport builder.
    #[must_use]
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::default()
    }

    /// The transport configuration.
    #[must_use]
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: Request, body: Option<Body>, _configs: Configs) -> ChainFuture {
        let service = self.service.clone();
        Box::pin(async move {
            let body = body
                .map(|body| body.materialize())
                .transpose()?
                .unwrap_or_default();
            trace!(method = %request.method(), url = %request.url(), bytes = body.len(), "sending");
            let request = to_http_request(request, body)?;
            service.call(request).await
        })
    }
}

type LayerFn = Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>;

/// Builder for [`HyperTransport`].
#[derive(Default)]
pub struct HyperTransportBuilder {
    config: TransportConfig,
    layers: Vec<LayerFn>,
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("config", &self.config)
            .field("layers_count", &self.layers.len())
            .finish()
    }
}

impl HyperTransportBuilder {
    /// Set the exchange timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config.pool_idle_per_host = count;
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Limit the number of in-flight requests.
    #[must_use]
    pub const fn concurrency_limit(mut self, max: usize) -> Self {
        self.config.concurrency_limit = Some(max);
        self
    }

    /// Add a Tower layer around the raw exchange.
    ///
    /// Layers are applied in order: first added = outermost.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<http::Request<Bytes>, Response = Response<Bytes>, Error = Error>
            + Clone
            + Send
            + 'static,
        <L::Service as Service<http::Request<Bytes>>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Build the transport.
    #[must_use]
    pub fn build(self) -> HyperTransport {
        let config = self.config;
        let raw = RawHyperTransport::new(config.clone());
        let mut service: BoxedService = BoxCloneService::new(raw);

        // Wrap innermost first so the first added ends up outermost.
        for layer_fn in self.layers.iter().rev() {
            service = layer_fn(service);
        }
        if let Some(max) = config.concurrency_limit {
            service = BoxCloneService::new(ConcurrencyLimitLayer::new(max).layer(service));
        }

        HyperTransport {
            service: SyncService::new(service),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::Method;

    use super::*;

    #[test]
    fn transport_default() {
        let transport = HyperTransport::new();
        assert_eq!(transport.config().timeout, Duration::from_secs(30));
    }

    #[test]
    fn transport_builder() {
        let transport = HyperTransport::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .concurrency_limit(4)
            .build();

        assert_eq!(transport.config().timeout, Duration::from_secs(60));
        assert_eq!(transport.config().pool_idle_per_host, 16);
        assert_eq!(transport.config().concurrency_limit, Some(4));
    }

    #[test]
    fn transport_is_debug() {
        let debug = format!("{:?}", HyperTransport::new());
        assert!(debug.contains("HyperTransport"));
    }

    #[test]
    fn http_request_keeps_everything() {
        let request = Request::builder(
            Method::PUT,
            url::Url::parse("https://example.com/pets/1?dry_run=true").expect("valid url"),
        )
        .header("x-one", "1")
        .build();

        let http_request =
            to_http_request(request, Bytes::from_static(b"{}")).expect("valid request");

        assert_eq!(http_request.method(), Method::PUT);
        assert_eq!(
            http_request.uri().to_string(),
            "https://example.com/pets/1?dry_run=true"
        );
        assert_eq!(http_request.headers()["x-one"], "1");
        assert_eq!(http_request.body().as_ref(), b"{}");
    }
}
