use crate::error::{Error, Result};
use crate::http::{RawResponse, Response};
use crate::lifecycle::LifecycleState;
use crate::reply::Reply;
use crate::routing::{Route, RouteConfig};
use bytes::{Bytes, BytesMut};
use hyper::body::HttpBody;
use hyper::{Body, Request as HyperRequest, StatusCode};
use serde::de::DeserializeOwned;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// One inbound HTTP exchange
///
/// Owned by a single lifecycle run from arrival until the response has been
/// transmitted. Hooks and handlers receive it mutably; onRequest hooks may
/// rewrite `method` and the url before routing happens.
pub struct Request {
    pub method: String,
    url: String,
    path: String,
    pub query: HashMap<String, String>,
    /// Header names are stored lowercase
    pub headers: HashMap<String, String>,
    pub params: HashMap<String, String>,
    payload: Bytes,
    id: Uuid,
    received_at: Instant,
    state: LifecycleState,
    route: Option<Arc<Route>>,
    reply: Option<Reply>,
    replied: bool,
    response: Option<Response>,
    sent_status: Option<StatusCode>,
    raw: RawResponse,
    /// Storage for hook data
    data: HashMap<String, Box<dyn Any + Send + Sync>>,
}

impl Request {
    pub fn new(method: &str, url: &str) -> Self {
        let mut request = Request {
            method: method.to_uppercase(),
            url: String::new(),
            path: String::new(),
            query: HashMap::new(),
            headers: HashMap::new(),
            params: HashMap::new(),
            payload: Bytes::new(),
            id: Uuid::new_v4(),
            received_at: Instant::now(),
            state: LifecycleState::Created,
            route: None,
            reply: None,
            replied: false,
            response: None,
            sent_status: None,
            raw: RawResponse::new(),
            data: HashMap::new(),
        };
        request.set_url(url);
        request
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Build a request from a hyper request, reading at most `max_bytes` of body
    pub async fn from_hyper(req: HyperRequest<Body>, max_bytes: usize) -> Result<Self> {
        let (parts, mut body) = req.into_parts();

        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut request = Request::new(parts.method.as_str(), url);
        for (name, value) in parts.headers.iter() {
            if let Ok(value_str) = value.to_str() {
                request
                    .headers
                    .insert(name.as_str().to_string(), value_str.to_string());
            }
        }

        if let Some(declared) = request
            .header("content-length")
            .and_then(|v| v.parse::<usize>().ok())
        {
            if declared > max_bytes {
                return Err(Error::PayloadTooLarge(format!(
                    "Payload of {} bytes exceeds the {} byte limit",
                    declared, max_bytes
                )));
            }
        }

        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.data().await {
            let chunk = chunk?;
            if buffer.len() + chunk.len() > max_bytes {
                return Err(Error::PayloadTooLarge(format!(
                    "Payload exceeds the {} byte limit",
                    max_bytes
                )));
            }
            buffer.extend_from_slice(&chunk);
        }
        request.payload = buffer.freeze();

        Ok(request)
    }

    /// Unique id of this exchange
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Time since the request was received
    pub fn elapsed(&self) -> Duration {
        self.received_at.elapsed()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Rewrite the request url. Path and query are re-parsed.
    pub fn set_url(&mut self, url: &str) {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (url, ""),
        };

        self.url = url.to_string();
        self.path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
        self.query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
    }

    pub fn set_method(&mut self, method: &str) {
        self.method = method.to_uppercase();
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(|v| v.as_str())
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn payload_as_string(&self) -> String {
        String::from_utf8_lossy(&self.payload).to_string()
    }

    pub fn payload_as_json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| Error::bad_request(format!("Invalid JSON payload: {}", e)))
    }

    /// Route matched for this request, once routing has happened
    pub fn route(&self) -> Option<&Route> {
        self.route.as_deref()
    }

    /// Effective config of the matched route
    pub fn route_config(&self) -> Option<&RouteConfig> {
        self.route.as_deref().map(|route| &route.config)
    }

    pub(crate) fn bind_route(&mut self, route: Arc<Route>, params: HashMap<String, String>) {
        self.route = Some(route);
        self.params = params;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: LifecycleState) {
        if !self.state.can_transition_to(next) {
            log::warn!(
                "Request {} moved from {:?} to {:?} out of order",
                self.id,
                self.state,
                next
            );
        }
        log::debug!("Request {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }

    /// Finalize the reply for this request
    ///
    /// Only one reply is accepted; a second call fails with
    /// [`Error::AlreadyReplied`] and leaves the first reply in place.
    pub fn reply<R: Into<Reply>>(&mut self, value: R) -> Result<()> {
        if self.replied {
            log::error!(
                "Request {} ({} {}) replied to more than once",
                self.id,
                self.method,
                self.path
            );
            return Err(Error::AlreadyReplied);
        }
        self.replied = true;
        self.reply = Some(value.into());
        Ok(())
    }

    pub fn has_replied(&self) -> bool {
        self.replied
    }

    pub(crate) fn take_reply(&mut self) -> Option<Reply> {
        self.reply.take()
    }

    /// Resolved response, visible to onPostHandler hooks
    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn response_mut(&mut self) -> Option<&mut Response> {
        self.response.as_mut()
    }

    pub(crate) fn set_response(&mut self, response: Response) {
        self.response = Some(response);
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    /// Status that was written to the transport, once sent
    pub fn status(&self) -> Option<StatusCode> {
        self.sent_status
    }

    pub(crate) fn mark_sent(&mut self, status: StatusCode) {
        self.sent_status = Some(status);
    }

    /// Direct transport access for the onUnknownRoute hook
    pub fn raw(&self) -> &RawResponse {
        &self.raw
    }

    pub fn raw_mut(&mut self) -> &mut RawResponse {
        &mut self.raw
    }

    pub(crate) fn take_raw(&mut self) -> RawResponse {
        std::mem::take(&mut self.raw)
    }

    /// Store data for later hooks or the handler
    pub fn set<T: Any + Send + Sync + 'static>(&mut self, key: &str, value: T) {
        self.data.insert(key.to_string(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync + 'static>(&self, key: &str) -> Option<&T> {
        self.data
            .get(key)
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn remove<T: Any + Send + Sync + 'static>(&mut self, key: &str) -> Option<T> {
        let boxed = self.data.remove(key)?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("state", &self.state)
            .field("payload_len", &self.payload.len())
            .field("replied", &self.replied)
            .finish()
    }
}
