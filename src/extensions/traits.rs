//! Hook contract for lifecycle extension points.
//!
//! A hook receives the request and a [`Next`] token. Letting the chain go on
//! means calling [`Next::proceed`] and returning the resulting [`Continue`];
//! returning an error aborts the chain and the request is answered with that
//! error. A hook has no way to produce a `Continue` other than consuming its
//! own `Next`, so it cannot signal continuation twice.

use super::ExtensionPoint;
use crate::error::Result;
use crate::http::Request;
use async_trait::async_trait;

/// Proof that a hook let the chain continue
#[must_use = "return the Continue token from the hook"]
#[derive(Debug)]
pub struct Continue(());

/// Single-use continuation handed to each hook invocation
#[derive(Debug)]
pub struct Next {
    point: ExtensionPoint,
}

impl Next {
    pub(crate) fn new(point: ExtensionPoint) -> Self {
        Self { point }
    }

    /// Let the chain continue with the next hook or stage
    pub fn proceed(self) -> Continue {
        Continue(())
    }

    /// Extension point this hook is running at
    pub fn point(&self) -> ExtensionPoint {
        self.point
    }
}

#[async_trait]
pub trait Extension: Send + Sync + 'static {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue>;

    /// Name used in debug logging
    fn name(&self) -> &'static str {
        "unnamed"
    }
}
