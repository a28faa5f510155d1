use crate::http::Response;
use bytes::{Bytes, BytesMut};
use hyper::StatusCode;

/// Low-level transport handle given to the onUnknownRoute hook
///
/// Writes bypass reply resolution entirely. Whatever the hook wrote is sent
/// as-is once the hook chain finishes.
#[derive(Debug)]
pub struct RawResponse {
    status: StatusCode,
    headers: Vec<(String, String)>,
    body: BytesMut,
    head_written: bool,
    ended: bool,
}

impl Default for RawResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl RawResponse {
    pub fn new() -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            headers: Vec::new(),
            body: BytesMut::new(),
            head_written: false,
            ended: false,
        }
    }

    /// Write the status line and headers. Only the first call takes effect.
    pub fn write_head(&mut self, status: u16, headers: &[(&str, &str)]) -> &mut Self {
        if self.head_written {
            log::warn!("Raw response head written twice, ignoring");
            return self;
        }

        match StatusCode::from_u16(status) {
            Ok(code) => self.status = code,
            Err(_) => log::warn!("Ignoring invalid raw status code {}", status),
        }
        self.headers.extend(
            headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string())),
        );
        self.head_written = true;
        self
    }

    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        if self.ended {
            log::warn!("Write after end on raw response, ignoring");
            return self;
        }
        self.head_written = true;
        self.body.extend_from_slice(chunk.as_ref());
        self
    }

    pub fn end(&mut self) {
        self.head_written = true;
        self.ended = true;
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub(crate) fn into_response(self) -> Response {
        let body: Bytes = self.body.freeze();
        let mut response = Response::new(self.status);

        for (name, value) in &self.headers {
            if let Err(e) = response.set_header(name, value) {
                log::warn!("Dropping raw response header: {}", e);
            }
        }
        if response.header("content-type").is_none() && !body.is_empty() {
            let _ = response.set_header("content-type", "text/plain");
        }

        response.set_content_length(body.len() as u64);
        response.set_full_body(body);
        response
    }
}
