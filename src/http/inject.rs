//! In-process request injection, used by tests and tooling.

use crate::http::Request;
use bytes::Bytes;
use hyper::header::CONTENT_TYPE;
use indexmap::IndexMap;

/// A simulated request
#[derive(Debug, Clone)]
pub struct Inject {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub payload: Bytes,
}

impl Inject {
    pub fn new(method: &str, url: &str) -> Self {
        Self {
            method: method.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            payload: Bytes::new(),
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: &str) -> Self {
        Self::new("POST", url)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn payload(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// JSON payload with a matching content-type
    pub fn json<T: serde::Serialize>(self, value: &T) -> crate::error::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self.header("content-type", "application/json").payload(body))
    }

    pub(crate) fn into_request(self) -> Request {
        let length = self.payload.len().to_string();
        let mut request = Request::new(&self.method, &self.url);
        for (name, value) in &self.headers {
            request = request.with_header(name, value);
        }
        if !self.payload.is_empty() && request.header("content-length").is_none() {
            request = request.with_header("content-length", &length);
        }
        request.with_payload(self.payload)
    }
}

/// Observable result of an injected request
#[derive(Debug, Clone)]
pub struct InjectResponse {
    pub status_code: u16,
    /// Header names are lowercase
    pub headers: IndexMap<String, String>,
    /// Parsed JSON for JSON responses, otherwise the body as a string
    pub result: serde_json::Value,
    pub raw_payload: Bytes,
}

impl InjectResponse {
    pub(crate) fn from_parts(parts: hyper::http::response::Parts, raw_payload: Bytes) -> Self {
        let mut headers = IndexMap::new();
        for (name, value) in parts.headers.iter() {
            headers.insert(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).to_string(),
            );
        }

        let is_json = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let text = String::from_utf8_lossy(&raw_payload).to_string();
        let result = if is_json {
            serde_json::from_slice(&raw_payload).unwrap_or(serde_json::Value::String(text))
        } else {
            serde_json::Value::String(text)
        };

        Self {
            status_code: parts.status.as_u16(),
            headers,
            result,
            raw_payload,
        }
    }

    /// Body as text
    pub fn read_payload(&self) -> String {
        String::from_utf8_lossy(&self.raw_payload).to_string()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }
}
