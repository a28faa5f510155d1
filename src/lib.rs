//! hookway - an HTTP server framework built around an extension-driven
//! request lifecycle
//!
//! hookway provides:
//! - Named extension points (onRequest, onPreHandler, onPostHandler,
//!   onPostRoute, onUnknownRoute) with ordered hook chains
//! - A single reply per request, resolved into a response from text, JSON,
//!   buffers, errors, streams or files
//! - Streamed bodies that finish cleanly even when their source fails
//! - In-process request injection for tests

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod extensions;
pub mod http;
pub mod lifecycle;
pub mod reply;
pub mod routing;
pub mod validation;

// Re-export main types for public API
pub use app::{Server, ServerBuilder};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use extensions::{Continue, Extension, ExtensionPoint, Hooks, Next};
pub use http::{Inject, InjectResponse, Request, Response};
pub use lifecycle::LifecycleState;
pub use reply::{Reply, ReplyKind, ReplyStream, StreamEvent, StreamOutcome, StreamSender};
pub use routing::{AuthMode, Route, RouteConfig, RouteHandler};
pub use validation::Validator;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use bytes::Bytes;
pub use serde::{Deserialize, Serialize};
pub use serde_json::{json, Value};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::*;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::json;
    pub use std::collections::HashMap;
}
