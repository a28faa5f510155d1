use crate::config::AppConfig;
use crate::error::{Error, ErrorChain, Result};
use crate::extensions::builtin::RequestLogger;
use crate::extensions::{Extension, ExtensionPoint, ExtensionRegistry, Hooks};
use crate::http::{Inject, InjectResponse, Listener, Request};
use crate::lifecycle::{Lifecycle, ServerState, Transmission};
use crate::reply::{resolve, Reply, ResolveOptions};
use crate::routing::{Route, RouteConfig, Router};
use hyper::Body;
use std::sync::Arc;

/// A built server: route table, extension chains and configuration
///
/// Cheap to clone; all clones share the same read-only state.
#[derive(Clone)]
pub struct Server {
    state: Arc<ServerState>,
    config: Arc<AppConfig>,
}

/// Collects configuration, extensions and routes, then validates them all
/// at once in [`ServerBuilder::build`].
pub struct ServerBuilder {
    config: AppConfig,
    extensions: ExtensionRegistry,
    route_defaults: Option<RouteConfig>,
    routes: Vec<Route>,
    errors: Vec<Error>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
            extensions: ExtensionRegistry::new(),
            route_defaults: None,
            routes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Load configuration from a TOML file; failures surface from `build`
    #[cfg(feature = "config")]
    pub fn config_file(mut self, path: &str) -> Self {
        match AppConfig::from_file(path) {
            Ok(config) => self.config = config,
            Err(e) => self.errors.push(e),
        }
        self
    }

    /// Attach one hook to an extension point
    pub fn ext<E: Extension>(self, point: ExtensionPoint, hook: E) -> Self {
        self.ext_hooks(point, Hooks::single(hook))
    }

    /// Attach several hooks to an extension point, run in list order
    pub fn ext_list(self, point: ExtensionPoint, hooks: Vec<Arc<dyn Extension>>) -> Self {
        self.ext_hooks(point, Hooks::list(hooks))
    }

    pub fn ext_hooks(mut self, point: ExtensionPoint, hooks: Hooks) -> Self {
        if let Err(e) = self.extensions.register(point, hooks) {
            self.errors.push(e);
        }
        self
    }

    /// Attach hooks by point name, e.g. "onPostHandler"
    pub fn on(mut self, point: &str, hooks: Hooks) -> Self {
        if let Err(e) = self.extensions.register_named(point, hooks) {
            self.errors.push(e);
        }
        self
    }

    /// Server-wide route defaults. Overrides `[routes]` from the config.
    pub fn route_defaults(mut self, defaults: RouteConfig) -> Self {
        self.route_defaults = Some(defaults);
        self
    }

    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    pub fn routes(mut self, routes: Vec<Route>) -> Self {
        self.routes.extend(routes);
        self
    }

    pub fn build(self) -> Result<Server> {
        let ServerBuilder {
            config,
            mut extensions,
            route_defaults,
            routes,
            errors,
        } = self;

        if let Some(first) = errors.into_iter().next() {
            log::error!("Server configuration failed: {}", first);
            return Err(first);
        }

        config.validate()?;

        let defaults =
            route_defaults.unwrap_or_else(|| RouteConfig::new().auth(config.routes.auth));
        let mut router = Router::with_defaults(defaults);
        for route in routes {
            router.add_route(route)?;
        }

        if config.logging.requests {
            let logger: Arc<dyn Extension> = Arc::new(RequestLogger::new());
            extensions.prepend(ExtensionPoint::OnRequest, Arc::clone(&logger));
            extensions.prepend(ExtensionPoint::OnPostRoute, logger);
        }

        log::info!(
            "Server built with {} route(s) for {} environment",
            router.route_count(),
            config.environment.as_str()
        );

        let resolve = ResolveOptions {
            files_root: config.files.relative_to.clone(),
            chunk_size: config.files.chunk_size,
        };

        Ok(Server {
            state: Arc::new(ServerState {
                router,
                extensions,
                resolve,
            }),
            config: Arc::new(config),
        })
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn route_count(&self) -> usize {
        self.state.router.route_count()
    }

    /// Run a request through the full lifecycle without a socket
    ///
    /// Resolves after the body has been drained and onPostRoute hooks have
    /// finished, so anything they record is visible to the caller.
    pub async fn inject(&self, inject: Inject) -> Result<InjectResponse> {
        let request = inject.into_request();
        let Transmission {
            response,
            post_route,
        } = Lifecycle::new(Arc::clone(&self.state), request).run().await;

        let (parts, body) = response.into_parts();
        let payload = hyper::body::to_bytes(body).await?;
        post_route.run().await;

        Ok(InjectResponse::from_parts(parts, payload))
    }

    /// Callback form of [`Server::inject`]
    pub async fn inject_with<F>(&self, inject: Inject, callback: F) -> Result<()>
    where
        F: FnOnce(InjectResponse),
    {
        let response = self.inject(inject).await?;
        callback(response);
        Ok(())
    }

    /// Entry point for the transport: one hyper request in, one response out
    ///
    /// A request whose body cannot be read (too large, broken transport) is
    /// answered before the lifecycle starts, so no hooks see it.
    pub(crate) async fn handle(&self, req: hyper::Request<Body>) -> hyper::Response<Body> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let request = match Request::from_hyper(req, self.config.payload.max_bytes).await {
            Ok(request) => request,
            Err(e) => {
                log::info!(
                    "← {} {} {} rejected before routing: {}",
                    method,
                    path,
                    e.status_code().as_u16(),
                    ErrorChain::new(&e)
                );
                let response = resolve(Reply::error(e), &self.state.resolve).await;
                return response.into_hyper().0;
            }
        };

        let Transmission {
            response,
            post_route,
        } = Lifecycle::new(Arc::clone(&self.state), request).run().await;
        tokio::spawn(post_route.run());
        response
    }

    pub async fn serve(self, addr: Option<&str>) -> Result<()> {
        let config_addr = self.config.server_address();
        let server_addr = addr.unwrap_or(&config_addr).to_string();
        Listener::new(self).serve(&server_addr).await
    }

    pub async fn start(self) -> Result<()> {
        self.serve(None).await
    }
}
