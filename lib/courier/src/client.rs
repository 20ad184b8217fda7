//! The client: plugin chain, transport, and retry stack behind one handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};
use std::time::Duration;

use tower::Layer;
use tower::util::BoxCloneService;
use tower_service::Service;

use courier_core::{Chain, Group, Matcher, Phase, Plugin, Transport};

use crate::{
    Error, Request, Response, Result,
    config::{ClientConfig, ClientConfigBuilder},
    dispatch::Dispatch,
    retry::RetryLayer,
    transport::{HyperTransport, TransportService},
};

/// Type-erased service for layer composition.
///
/// Storing the attempt stack behind this alias keeps the builder free of
/// nested generic service types.
pub type BoxedService = BoxCloneService<Request, Response, Error>;

/// Future type for the tower [`Service`] implementation.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response>> + Send + 'static>>;

/// Thread-safe wrapper for [`BoxedService`].
///
/// `BoxCloneService` is `Send` but not `Sync`; the mutex makes the client
/// shareable across tasks by reference.
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

    fn call(&self, request: Request) -> ServiceFuture {
        // Lock, clone the service, and release the lock immediately
        let mut service = self
            .inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();

        Box::pin(async move { service.call(request).await })
    }
}

/// HTTP pipeline client.
///
/// A client is an immutable handle over a built attempt stack: the plugin
/// chain and transport at the core, wrapped by whatever layers the builder
/// added. Cloning is cheap and clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use courier::prelude::*;
///
/// let client = Client::builder()
///     .use_request(|ctx: &mut Context| {
///         ctx.request.set_header("user-agent", "courier");
///         Flow::Next
///     })
///     .with_retry(3)
///     .build();
/// ```
#[derive(Clone)]
pub struct Client {
    service: SyncService,
    config: ClientConfig,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client with default configuration and an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a new client builder.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Execute a request through the full pipeline.
    ///
    /// # Errors
    ///
    /// Returns the error left in the context after the error phase ran, or
    /// a transport error no plugin recovered from.
    pub async fn execute(&self, request: Request) -> Result<Response> {
        self.service.call(request).await
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request> for Client {
    type Response = Response;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<()>> {
        // The underlying service is polled when called
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request) -> Self::Future {
        self.service.call(request)
    }
}

/// Builder for [`Client`].
///
/// Plugins registered here form the per-attempt chain; layers added via
/// [`ClientBuilder::layer`] (including retry) wrap the whole attempt.
///
/// # Example
///
/// ```ignore
/// use courier::prelude::*;
///
/// let client = Client::builder()
///     .timeout(std::time::Duration::from_secs(10))
///     .use_matched(Phase::Request, Matcher::method(Method::Post), audit_plugin)
///     .retry(RetryLayer::new().retries(2))
///     .build();
/// ```
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfigBuilder,
    chain: Chain,
    layers: Vec<Arc<dyn Fn(BoxedService) -> BoxedService + Send + Sync>>,
    transport: Option<BoxedService>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("config", &self.config)
            .field("chain", &self.chain)
            .field("layers_count", &self.layers.len())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl ClientBuilder {
    // ========================================================================
    // Core Configuration
    // ========================================================================

    /// Set the request timeout (applied at the transport level).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.connect_timeout(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.config = self.config.pool_idle_per_host(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.pool_idle_timeout(timeout);
        self
    }

    // ========================================================================
    // Plugin Chain
    // ========================================================================

    /// Register a plugin for an arbitrary phase.
    #[must_use]
    pub fn use_in(mut self, phase: Phase, plugin: impl Plugin + 'static) -> Self {
        self.chain.use_in(phase, plugin);
        self
    }

    /// Register a plugin gated by a matcher.
    ///
    /// The matcher is evaluated against the live context on every dispatch,
    /// so a plugin earlier in the same phase can change whether it runs.
    #[must_use]
    pub fn use_matched(
        mut self,
        phase: Phase,
        matcher: Matcher,
        plugin: impl Plugin + 'static,
    ) -> Self {
        self.chain.use_matched(phase, matcher, plugin);
        self
    }

    /// Register a request-phase plugin.
    #[must_use]
    pub fn use_request(mut self, plugin: impl Plugin + 'static) -> Self {
        self.chain.use_request(plugin);
        self
    }

    /// Register a response-phase plugin.
    #[must_use]
    pub fn use_response(mut self, plugin: impl Plugin + 'static) -> Self {
        self.chain.use_response(plugin);
        self
    }

    /// Register an error-phase plugin.
    #[must_use]
    pub fn use_error(mut self, plugin: impl Plugin + 'static) -> Self {
        self.chain.use_error(plugin);
        self
    }

    /// Mount a plugin group, gating all its plugins behind its matcher.
    #[must_use]
    pub fn mount(mut self, group: Group) -> Self {
        self.chain.mount(group);
        self
    }

    // ========================================================================
    // Attempt Stack
    // ========================================================================

    /// Add a tower layer around the attempt.
    ///
    /// Layers wrap inside-out: the last layer added becomes the outermost
    /// one and sees each call first. Stacking two retry layers therefore
    /// multiplies attempts, since the outer layer re-runs the inner layer's
    /// whole loop.
    #[must_use]
    pub fn layer<L>(mut self, layer: L) -> Self
    where
        L: Layer<BoxedService> + Send + Sync + 'static,
        L::Service: Service<Request, Response = Response, Error = Error> + Clone + Send + 'static,
        <L::Service as Service<Request>>::Future: Send,
    {
        self.layers.push(Arc::new(move |service| {
            BoxCloneService::new(layer.layer(service))
        }));
        self
    }

    /// Add a retry layer around the attempt.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let client = Client::builder()
    ///     .retry(RetryLayer::new().retries(2).backoff(ExponentialBackoff::default()))
    ///     .build();
    /// ```
    #[must_use]
    pub fn retry(self, layer: RetryLayer) -> Self {
        self.layer(layer)
    }

    /// Add retry with the given number of retries and the default policy
    /// (transport errors and 5xx responses, constant backoff).
    #[must_use]
    pub fn with_retry(self, retries: usize) -> Self {
        self.retry(RetryLayer::new().retries(retries))
    }

    /// Replace the default hyper transport.
    ///
    /// Mainly useful for tests and in-process fakes.
    #[must_use]
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + Clone + Send + Sync + 'static,
    {
        self.transport = Some(BoxCloneService::new(TransportService::new(transport)));
        self
    }

    // ========================================================================
    // Build
    // ========================================================================

    /// Build the client.
    #[must_use]
    pub fn build(self) -> Client {
        let config = self.config.build();

        let transport = self.transport.unwrap_or_else(|| {
            BoxCloneService::new(TransportService::new(HyperTransport::new(&config)))
        });

        let dispatch = Dispatch::new(Arc::new(self.chain), transport);
        let mut service: BoxedService = BoxCloneService::new(dispatch);

        // Wrap in registration order, so the last layer added ends up
        // outermost.
        for layer_fn in self.layers {
            service = layer_fn(service);
        }

        Client {
            service: SyncService::new(service),
            config,
        }
    }
}
