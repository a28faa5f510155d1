//! Trie-based route table
//!
//! Static segments, `{name}` parameters, a trailing optional `{name?}`
//! parameter and a trailing `*` wildcard. Static children are tried before
//! parameters, parameters before wildcards.

use super::Route;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct TrieNode {
    /// Exact path segment match
    static_children: HashMap<String, TrieNode>,
    /// Dynamic parameter match (e.g., {id})
    param_child: Option<(String, Box<TrieNode>)>,
    /// Wildcard match (*), consumes the rest of the path
    wildcard_child: Option<Box<TrieNode>>,
    /// Routes for each HTTP method at this node
    routes: HashMap<String, Arc<Route>>,
}

impl TrieNode {
    fn new() -> Self {
        Self {
            static_children: HashMap::new(),
            param_child: None,
            wildcard_child: None,
            routes: HashMap::new(),
        }
    }

    fn param_node(&mut self, name: &str, path: &str) -> Result<&mut TrieNode> {
        if let Some((existing, _)) = &self.param_child {
            if existing != name {
                return Err(Error::config(format!(
                    "Route '{}' names parameter '{}' where '{}' is already registered",
                    path, name, existing
                )));
            }
        }

        let (_, node) = self
            .param_child
            .get_or_insert_with(|| (name.to_string(), Box::new(TrieNode::new())));
        Ok(&mut **node)
    }

    fn insert(&mut self, route: Arc<Route>) -> Result<()> {
        if self.routes.contains_key(&route.method) {
            return Err(Error::config(format!(
                "Duplicate route: {} {}",
                route.method, route.path
            )));
        }
        self.routes.insert(route.method.clone(), route);
        Ok(())
    }
}

/// Path segment types for trie construction
#[derive(Debug, Clone, PartialEq)]
enum PathSegment {
    Static(String),
    Parameter(String),
    OptionalParameter(String),
    Wildcard,
}

pub struct TrieRouter {
    root: TrieNode,
    route_count: usize,
}

impl Default for TrieRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl TrieRouter {
    pub fn new() -> Self {
        Self {
            root: TrieNode::new(),
            route_count: 0,
        }
    }

    /// Add a route to the trie
    ///
    /// Fails on duplicate method/path pairs, on optional or wildcard
    /// segments anywhere but last, and on conflicting parameter names.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        let segments = Self::parse_path(&route.path)?;
        let route = Arc::new(route);
        let mut current = &mut self.root;

        for segment in segments {
            match segment {
                PathSegment::Static(segment_str) => {
                    current = current
                        .static_children
                        .entry(segment_str)
                        .or_insert_with(TrieNode::new);
                }
                PathSegment::Parameter(name) => {
                    current = current.param_node(&name, &route.path)?;
                }
                PathSegment::OptionalParameter(name) => {
                    // Reachable both with and without the trailing segment
                    current.insert(Arc::clone(&route))?;
                    current = current.param_node(&name, &route.path)?;
                }
                PathSegment::Wildcard => {
                    current = &mut **current
                        .wildcard_child
                        .get_or_insert_with(|| Box::new(TrieNode::new()));
                }
            }
        }

        current.insert(route)?;
        self.route_count += 1;
        Ok(())
    }

    /// Match a route in the trie
    ///
    /// Returns the route and extracted, percent-decoded parameters.
    pub fn match_route(
        &self,
        method: &str,
        path: &str,
    ) -> Option<(Arc<Route>, HashMap<String, String>)> {
        // Remove query parameters
        let path_only = path.split('?').next().unwrap_or("");

        let segments: Vec<&str> = path_only
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let method = method.to_uppercase();
        let mut params = HashMap::new();

        self.match_segments(&self.root, &segments, 0, &method, &mut params)
            .map(|route| (route, params))
    }

    pub fn route_count(&self) -> usize {
        self.route_count
    }

    fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
        let raw: Vec<&str> = path
            .trim_start_matches('/')
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let mut segments = Vec::with_capacity(raw.len());
        for (index, segment) in raw.iter().enumerate() {
            let last = index + 1 == raw.len();
            let parsed = if *segment == "*" {
                PathSegment::Wildcard
            } else if let Some(name) = segment
                .strip_prefix('{')
                .and_then(|s| s.strip_suffix("?}"))
            {
                PathSegment::OptionalParameter(name.to_string())
            } else if let Some(name) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}'))
            {
                PathSegment::Parameter(name.to_string())
            } else {
                PathSegment::Static(segment.to_string())
            };

            if !last && matches!(parsed, PathSegment::Wildcard | PathSegment::OptionalParameter(_))
            {
                return Err(Error::config(format!(
                    "Route '{}': '{}' is only allowed as the last segment",
                    path, segment
                )));
            }
            segments.push(parsed);
        }

        Ok(segments)
    }

    fn match_segments(
        &self,
        node: &TrieNode,
        segments: &[&str],
        index: usize,
        method: &str,
        params: &mut HashMap<String, String>,
    ) -> Option<Arc<Route>> {
        if index >= segments.len() {
            return node.routes.get(method).cloned();
        }

        let current_segment = segments[index];

        if let Some(child) = node.static_children.get(current_segment) {
            if let Some(route) = self.match_segments(child, segments, index + 1, method, params) {
                return Some(route);
            }
        }

        if let Some((param_name, child)) = &node.param_child {
            let value = percent_encoding::percent_decode_str(current_segment)
                .decode_utf8_lossy()
                .into_owned();
            params.insert(param_name.clone(), value);
            if let Some(route) = self.match_segments(child, segments, index + 1, method, params) {
                return Some(route);
            }
            params.remove(param_name);
        }

        if let Some(child) = &node.wildcard_child {
            if let Some(route) = child.routes.get(method) {
                params.insert("*".to_string(), segments[index..].join("/"));
                return Some(Arc::clone(route));
            }
        }

        None
    }
}
