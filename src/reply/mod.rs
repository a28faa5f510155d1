//! Reply values and their resolution into responses.

pub mod resolver;
pub mod stream;

pub use resolver::{resolve, ResolveOptions};
pub use stream::{ReplyStream, StreamAdapter, StreamEvent, StreamOutcome, StreamSender};

use crate::error::Error;
use bytes::Bytes;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// What a handler answered with
#[derive(Debug)]
pub enum Payload {
    Empty,
    Text(String),
    Buffer(Bytes),
    /// Serialized eagerly; a serialization failure surfaces at resolution
    Json(serde_json::Result<Vec<u8>>),
    Error(Error),
    Stream(ReplyStream),
    File(PathBuf),
}

/// Coarse classification of a reply value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Empty,
    Text,
    Error,
    Stream,
    File,
}

/// A reply value plus the overrides the handler attached to it
#[derive(Debug)]
pub struct Reply {
    payload: Payload,
    code: Option<u16>,
    content_type: Option<String>,
    bytes: Option<u64>,
    headers: Vec<(String, String)>,
}

impl Reply {
    fn from_payload(payload: Payload) -> Self {
        Self {
            payload,
            code: None,
            content_type: None,
            bytes: None,
            headers: Vec::new(),
        }
    }

    pub fn empty() -> Self {
        Self::from_payload(Payload::Empty)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::from_payload(Payload::Text(text.into()))
    }

    pub fn buffer(buffer: impl Into<Bytes>) -> Self {
        Self::from_payload(Payload::Buffer(buffer.into()))
    }

    pub fn json<T: Serialize + ?Sized>(value: &T) -> Self {
        Self::from_payload(Payload::Json(serde_json::to_vec(value)))
    }

    pub fn error(error: Error) -> Self {
        Self::from_payload(Payload::Error(error))
    }

    pub fn stream(stream: ReplyStream) -> Self {
        Self::from_payload(Payload::Stream(stream))
    }

    /// Serve a file. Relative paths resolve against the configured files root.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::from_payload(Payload::File(path.into()))
    }

    /// Override the status code
    pub fn code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Override the default content-type
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declare the body length. Text bodies are cut to `n` bytes and streams
    /// stop forwarding after `n` bytes.
    pub fn bytes(mut self, n: u64) -> Self {
        self.bytes = Some(n);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn kind(&self) -> ReplyKind {
        match self.payload {
            Payload::Empty => ReplyKind::Empty,
            Payload::Text(_) | Payload::Buffer(_) | Payload::Json(_) => ReplyKind::Text,
            Payload::Error(_) => ReplyKind::Error,
            Payload::Stream(_) => ReplyKind::Stream,
            Payload::File(_) => ReplyKind::File,
        }
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::empty()
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::text(text)
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::text(text)
    }
}

impl From<Bytes> for Reply {
    fn from(buffer: Bytes) -> Self {
        Reply::buffer(buffer)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(buffer: Vec<u8>) -> Self {
        Reply::buffer(buffer)
    }
}

impl From<serde_json::Value> for Reply {
    fn from(value: serde_json::Value) -> Self {
        Reply::json(&value)
    }
}

impl From<Error> for Reply {
    fn from(error: Error) -> Self {
        Reply::error(error)
    }
}

impl From<ReplyStream> for Reply {
    fn from(stream: ReplyStream) -> Self {
        Reply::stream(stream)
    }
}

impl From<PathBuf> for Reply {
    fn from(path: PathBuf) -> Self {
        Reply::file(path)
    }
}

impl From<&Path> for Reply {
    fn from(path: &Path) -> Self {
        Reply::file(path)
    }
}

pub(crate) struct ReplyParts {
    pub payload: Payload,
    pub code: Option<u16>,
    pub content_type: Option<String>,
    pub bytes: Option<u64>,
    pub headers: Vec<(String, String)>,
}

impl Reply {
    pub(crate) fn into_parts(self) -> ReplyParts {
        ReplyParts {
            payload: self.payload,
            code: self.code,
            content_type: self.content_type,
            bytes: self.bytes,
            headers: self.headers,
        }
    }
}
