use crate::error::{Error, Result};
use crate::reply::stream::{ReplyStream, SentSignal, StreamAdapter};
use bytes::Bytes;
use hyper::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::StatusCode;

/// Body of the fallback answer used whenever a reply cannot be resolved
pub const GENERIC_ERROR_BODY: &str = r#"{"message": "An internal server error occurred"}"#;

pub enum ResponseBody {
    Full(Bytes),
    Stream(ReplyStream),
}

/// A resolved response: status, validated headers and a body ready to be
/// written. Produced by the reply resolver and visible to onPostHandler hooks.
pub struct Response {
    pub status: StatusCode,
    headers: HeaderMap,
    body: ResponseBody,
}

impl Response {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: ResponseBody::Full(Bytes::new()),
        }
    }

    /// Empty response that still advertises its zero length
    pub fn empty(status: StatusCode) -> Self {
        let mut response = Self::new(status);
        response.set_content_length(0);
        response
    }

    pub fn full(status: StatusCode, content_type: &str, body: Bytes) -> Result<Self> {
        let mut response = Self::new(status);
        response.set_header(CONTENT_TYPE.as_str(), content_type)?;
        response.set_content_length(body.len() as u64);
        response.body = ResponseBody::Full(body);
        Ok(response)
    }

    pub fn stream(status: StatusCode, content_type: &str, stream: ReplyStream) -> Result<Self> {
        let mut response = Self::new(status);
        response.set_header(CONTENT_TYPE.as_str(), content_type)?;
        response.body = ResponseBody::Stream(stream);
        Ok(response)
    }

    /// The fixed 500 answer. Built from static parts so it cannot fail.
    pub fn internal_error() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(GENERIC_ERROR_BODY.len()));

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            headers,
            body: ResponseBody::Full(Bytes::from_static(GENERIC_ERROR_BODY.as_bytes())),
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name.to_ascii_lowercase().as_str())
            .and_then(|v| v.to_str().ok())
    }

    /// Set a header, replacing any previous value
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| Error::invalid_reply(format!("Invalid header name '{}'", name)))?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            Error::invalid_reply(format!("Invalid value for header '{}'", name))
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    pub(crate) fn set_content_length(&mut self, length: u64) {
        self.headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
    }

    pub(crate) fn set_full_body(&mut self, body: Bytes) {
        self.body = ResponseBody::Full(body);
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn is_stream(&self) -> bool {
        matches!(self.body, ResponseBody::Stream(_))
    }

    /// Convert into a hyper response. The returned signal fires once the
    /// body has been fully written, cut short, or abandoned by the client.
    pub fn into_hyper(self) -> (hyper::Response<hyper::Body>, SentSignal) {
        let stream = match self.body {
            ResponseBody::Full(bytes) => ReplyStream::once(bytes),
            ResponseBody::Stream(stream) => stream,
        };
        let (adapter, sent) = StreamAdapter::new(stream);

        let mut response = hyper::Response::new(hyper::Body::wrap_stream(adapter));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        (response, sent)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("stream", &self.is_stream())
            .finish()
    }
}
