//! Validation stage interface
//!
//! A route may carry a [`Validator`] that runs after routing and before the
//! onPreHandler chain. Schema builders live outside this crate; anything that
//! can inspect a [`Request`] and return an error plugs in here.

use crate::error::Result;
use crate::http::Request;

pub trait Validator: Send + Sync + 'static {
    /// Reject the request by returning an error. Errors without an explicit
    /// status are answered with 400.
    fn validate(&self, request: &Request) -> Result<()>;
}

impl<F> Validator for F
where
    F: Fn(&Request) -> Result<()> + Send + Sync + 'static,
{
    fn validate(&self, request: &Request) -> Result<()> {
        self(request)
    }
}
