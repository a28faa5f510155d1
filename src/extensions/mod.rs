//! Extension registry
//!
//! Hooks are attached to named points of the request lifecycle and run in
//! registration order. Every point but onUnknownRoute accepts any number of
//! hooks; onUnknownRoute accepts exactly one.
//!
//! # Example
//!
//! ```rust,ignore
//! use hookway::prelude::*;
//!
//! struct Stamp;
//!
//! #[async_trait]
//! impl Extension for Stamp {
//!     async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
//!         if let Some(response) = request.response_mut() {
//!             response.set_header("x-stamp", "1")?;
//!         }
//!         Ok(next.proceed())
//!     }
//! }
//!
//! let server = Server::builder()
//!     .ext(ExtensionPoint::OnPostHandler, Stamp)
//!     .build()?;
//! ```

pub mod builtin;
pub mod traits;

pub use traits::{Continue, Extension, Next};

use crate::error::{Error, Result};
use crate::http::Request;
use futures::FutureExt;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::str::FromStr;
use std::sync::Arc;

/// Named points in the request lifecycle where hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionPoint {
    /// Before routing; may rewrite method and url
    OnRequest,
    /// After validation, before the handler
    OnPreHandler,
    /// After the reply is resolved, before it is written
    OnPostHandler,
    /// After the response has been fully transmitted
    OnPostRoute,
    /// No route matched; gets raw transport access
    OnUnknownRoute,
}

impl ExtensionPoint {
    pub const ALL: [ExtensionPoint; 5] = [
        ExtensionPoint::OnRequest,
        ExtensionPoint::OnPreHandler,
        ExtensionPoint::OnPostHandler,
        ExtensionPoint::OnPostRoute,
        ExtensionPoint::OnUnknownRoute,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExtensionPoint::OnRequest => "onRequest",
            ExtensionPoint::OnPreHandler => "onPreHandler",
            ExtensionPoint::OnPostHandler => "onPostHandler",
            ExtensionPoint::OnPostRoute => "onPostRoute",
            ExtensionPoint::OnUnknownRoute => "onUnknownRoute",
        }
    }

    /// Whether more than one hook may be attached
    pub fn accepts_many(&self) -> bool {
        !matches!(self, ExtensionPoint::OnUnknownRoute)
    }
}

impl fmt::Display for ExtensionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ExtensionPoint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ExtensionPoint::ALL
            .iter()
            .copied()
            .find(|point| point.name() == s)
            .ok_or_else(|| Error::config(format!("Unknown extension point '{}'", s)))
    }
}

/// One hook or a list of hooks to attach to a point
pub enum Hooks {
    Single(Arc<dyn Extension>),
    List(Vec<Arc<dyn Extension>>),
}

impl Hooks {
    pub fn single<E: Extension>(hook: E) -> Self {
        Hooks::Single(Arc::new(hook))
    }

    pub fn list(hooks: Vec<Arc<dyn Extension>>) -> Self {
        Hooks::List(hooks)
    }
}

#[derive(Default, Clone)]
pub struct ExtensionRegistry {
    chains: HashMap<ExtensionPoint, Vec<Arc<dyn Extension>>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach hooks to a point, after any already attached
    pub fn register(&mut self, point: ExtensionPoint, hooks: Hooks) -> Result<()> {
        let hooks = match hooks {
            Hooks::Single(hook) => vec![hook],
            Hooks::List(hooks) => {
                if !point.accepts_many() {
                    return Err(Error::config(format!(
                        "{} accepts a single hook, not a list",
                        point
                    )));
                }
                hooks
            }
        };

        if !point.accepts_many() && !self.is_empty(point) {
            return Err(Error::config(format!("{} already has a hook", point)));
        }

        let chain = self.chains.entry(point).or_default();
        for hook in hooks {
            log::debug!("Registering {} hook '{}'", point, hook.name());
            chain.push(hook);
        }
        Ok(())
    }

    /// Attach hooks to a point given by name, e.g. "onPreHandler"
    pub fn register_named(&mut self, point: &str, hooks: Hooks) -> Result<()> {
        self.register(point.parse()?, hooks)
    }

    /// Put a hook in front of the chain for `point`
    pub(crate) fn prepend(&mut self, point: ExtensionPoint, hook: Arc<dyn Extension>) {
        self.chains.entry(point).or_default().insert(0, hook);
    }

    pub fn chain(&self, point: ExtensionPoint) -> &[Arc<dyn Extension>] {
        self.chains
            .get(&point)
            .map(|chain| chain.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self, point: ExtensionPoint) -> usize {
        self.chain(point).len()
    }

    pub fn is_empty(&self, point: ExtensionPoint) -> bool {
        self.chain(point).is_empty()
    }

    /// Run every hook of `point` in order. Stops at the first error; a
    /// panicking hook counts as an error.
    pub async fn invoke(&self, point: ExtensionPoint, request: &mut Request) -> Result<()> {
        for (index, hook) in self.chain(point).iter().enumerate() {
            log::debug!(
                "Request {}: running {} hook #{} '{}'",
                request.id(),
                point,
                index,
                hook.name()
            );

            let caught = AssertUnwindSafe(hook.invoke(request, Next::new(point)))
                .catch_unwind()
                .await;
            let outcome = match caught {
                Ok(outcome) => outcome,
                Err(payload) => {
                    let context = format!("{} hook '{}'", point, hook.name());
                    log::error!("Request {}: {} panicked", request.id(), context);
                    Err(Error::from_panic(context, payload))
                }
            };

            if let Err(e) = outcome {
                log::debug!(
                    "Request {}: {} hook '{}' aborted the chain: {}",
                    request.id(),
                    point,
                    hook.name(),
                    e
                );
                return Err(e);
            }
        }
        Ok(())
    }
}
