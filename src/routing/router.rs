use super::trie::TrieRouter;
use super::{Route, RouteConfig};
use crate::error::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Route table owned by the server. Read-only once the server is built.
pub struct Router {
    trie: TrieRouter,
    defaults: RouteConfig,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self::with_defaults(RouteConfig::default())
    }

    /// Router whose routes inherit `defaults` for any setting they leave unset
    pub fn with_defaults(defaults: RouteConfig) -> Self {
        Self {
            trie: TrieRouter::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &RouteConfig {
        &self.defaults
    }

    /// Add a route, merging its config with the router defaults
    pub fn add_route(&mut self, mut route: Route) -> Result<()> {
        route.config = route.config.merged_with(&self.defaults);
        log::debug!("Registering route {} {}", route.method, route.path);
        self.trie.add_route(route)
    }

    pub fn match_route(
        &self,
        method: &str,
        path: &str,
    ) -> Option<(Arc<Route>, HashMap<String, String>)> {
        self.trie.match_route(method, path)
    }

    pub fn route_count(&self) -> usize {
        self.trie.route_count()
    }

    pub fn is_empty(&self) -> bool {
        self.route_count() == 0
    }
}
