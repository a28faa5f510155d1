pub mod router;
pub mod trie;

use crate::error::Result;
use crate::http::Request;
use crate::validation::Validator;
pub use router::Router;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

// Type alias for route handlers - replies through the request in place
pub type RouteHandler =
    for<'a> fn(&'a mut Request) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Authentication requirement attached to a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    None,
    Optional,
    Required,
}

/// Per-route settings. Unset fields inherit the server-wide defaults.
#[derive(Clone, Default)]
pub struct RouteConfig {
    pub auth: Option<AuthMode>,
    pub validate: Option<Arc<dyn Validator>>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn auth(mut self, mode: AuthMode) -> Self {
        self.auth = Some(mode);
        self
    }

    pub fn validate<V: Validator>(mut self, validator: V) -> Self {
        self.validate = Some(Arc::new(validator));
        self
    }

    /// Fill unset fields from `defaults`
    pub fn merged_with(&self, defaults: &RouteConfig) -> RouteConfig {
        RouteConfig {
            auth: self.auth.or(defaults.auth),
            validate: self.validate.clone().or_else(|| defaults.validate.clone()),
        }
    }

    /// Effective auth mode
    pub fn auth_mode(&self) -> AuthMode {
        self.auth.unwrap_or_default()
    }
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("auth", &self.auth)
            .field("validate", &self.validate.is_some())
            .finish()
    }
}

#[derive(Clone)]
pub struct Route {
    pub method: String,
    pub path: String,
    pub handler: RouteHandler,
    pub config: RouteConfig,
}

impl Route {
    pub fn new(method: &str, path: &str, handler: RouteHandler) -> Self {
        Self {
            method: method.to_uppercase(),
            path: path.to_string(),
            handler,
            config: RouteConfig::default(),
        }
    }

    pub fn get(path: &str, handler: RouteHandler) -> Self {
        Self::new("GET", path, handler)
    }

    pub fn post(path: &str, handler: RouteHandler) -> Self {
        Self::new("POST", path, handler)
    }

    pub fn put(path: &str, handler: RouteHandler) -> Self {
        Self::new("PUT", path, handler)
    }

    pub fn delete(path: &str, handler: RouteHandler) -> Self {
        Self::new("DELETE", path, handler)
    }

    pub fn with_config(mut self, config: RouteConfig) -> Self {
        self.config = config;
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

// Utility macro for creating routes
#[macro_export]
macro_rules! routes {
    ($($method:ident $path:literal => $handler:expr),* $(,)?) => {
        vec![
            $(
                $crate::routing::Route::new(
                    stringify!($method),
                    $path,
                    |req| Box::pin(async move { $handler(req).await })
                )
            ),*
        ]
    };
}
