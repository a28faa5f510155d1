//! Request logging extension
//!
//! Attached to onRequest it records the arrival time and logs the request
//! line; attached to onPostRoute it logs status, bytes written and timing
//! once the response has left.

use crate::error::Result;
use crate::extensions::{Continue, Extension, ExtensionPoint, Next};
use crate::http::Request;
use crate::reply::StreamOutcome;
use async_trait::async_trait;
use std::time::Instant;

const START_KEY: &str = "request_logger_start";

#[derive(Clone, Default)]
pub struct RequestLogger;

impl RequestLogger {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Extension for RequestLogger {
    async fn invoke(&self, request: &mut Request, next: Next) -> Result<Continue> {
        if !log::log_enabled!(log::Level::Info) {
            return Ok(next.proceed());
        }

        match next.point() {
            ExtensionPoint::OnRequest => {
                log::info!("→ {} {}", request.method, request.url());
                request.set(START_KEY, Instant::now());
            }
            ExtensionPoint::OnPostRoute => {
                let elapsed = request
                    .get::<Instant>(START_KEY)
                    .map(|start| start.elapsed())
                    .unwrap_or_else(|| request.elapsed());
                let status = request
                    .status()
                    .map(|s| s.as_u16().to_string())
                    .unwrap_or_else(|| "-".to_string());

                match request.get::<StreamOutcome>(crate::lifecycle::OUTCOME_KEY) {
                    Some(StreamOutcome::Completed { bytes }) => log::info!(
                        "← {} {} {} {}B in {:?}",
                        request.method,
                        request.path(),
                        status,
                        bytes,
                        elapsed
                    ),
                    Some(outcome) => log::warn!(
                        "← {} {} {} cut short ({:?}) in {:?}",
                        request.method,
                        request.path(),
                        status,
                        outcome,
                        elapsed
                    ),
                    None => log::info!(
                        "← {} {} {} in {:?}",
                        request.method,
                        request.path(),
                        status,
                        elapsed
                    ),
                }
            }
            _ => {}
        }

        Ok(next.proceed())
    }

    fn name(&self) -> &'static str {
        "request_logger"
    }
}
