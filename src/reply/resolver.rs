//! Turns a [`Reply`] into a [`Response`].
//!
//! Resolution never fails from the caller's point of view: anything that
//! goes wrong while resolving, including a panic, is logged and answered with
//! the fixed 500 response.

use super::{Payload, Reply, ReplyParts, ReplyStream};
use crate::error::{Error, ErrorChain, Result};
use crate::http::{mime, Response};
use bytes::Bytes;
use futures::FutureExt;
use hyper::StatusCode;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Base directory for relative file replies
    pub files_root: PathBuf,
    pub chunk_size: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            files_root: PathBuf::from("."),
            chunk_size: 64 * 1024,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: u16,
    error: &'a str,
    message: String,
}

pub async fn resolve(reply: Reply, options: &ResolveOptions) -> Response {
    match AssertUnwindSafe(try_resolve(reply, options))
        .catch_unwind()
        .await
    {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            log::error!(
                "Failed to resolve reply: {}",
                ErrorChain::new(&e).format_for_log()
            );
            Response::internal_error()
        }
        Err(_) => {
            log::error!("Reply resolution panicked");
            Response::internal_error()
        }
    }
}

async fn try_resolve(reply: Reply, options: &ResolveOptions) -> Result<Response> {
    let ReplyParts {
        payload,
        code,
        content_type,
        bytes,
        headers,
    } = reply.into_parts();

    let status = code.map(status_from_code).transpose()?;

    let mut response = match payload {
        Payload::Empty => Response::empty(status.unwrap_or(StatusCode::OK)),
        Payload::Text(text) => full_body(
            Bytes::from(text),
            status,
            content_type.as_deref().unwrap_or("text/plain"),
            bytes,
        )?,
        Payload::Buffer(buffer) => full_body(
            buffer,
            status,
            content_type.as_deref().unwrap_or(mime::OCTET_STREAM),
            bytes,
        )?,
        Payload::Json(serialized) => {
            let body = serialized
                .map_err(|e| Error::invalid_reply(format!("JSON serialization failed: {}", e)))?;
            full_body(
                Bytes::from(body),
                status,
                content_type.as_deref().unwrap_or("application/json"),
                bytes,
            )?
        }
        Payload::Error(error) => error_body(&error, status)?,
        Payload::Stream(stream) => {
            let content_type = content_type
                .or_else(|| stream.declared_content_type().map(str::to_string))
                .unwrap_or_else(|| mime::OCTET_STREAM.to_string());
            let stream = match bytes {
                Some(n) => stream.bytes(n),
                None => stream,
            };
            Response::stream(status.unwrap_or(StatusCode::OK), &content_type, stream)?
        }
        Payload::File(path) => file_body(&path, status, content_type, options).await?,
    };

    for (name, value) in &headers {
        response.set_header(name, value)?;
    }

    Ok(response)
}

fn status_from_code(code: u16) -> Result<StatusCode> {
    StatusCode::from_u16(code)
        .map_err(|_| Error::invalid_reply(format!("Invalid status code {}", code)))
}

fn full_body(
    body: Bytes,
    status: Option<StatusCode>,
    content_type: &str,
    declared: Option<u64>,
) -> Result<Response> {
    let body = match declared {
        Some(n) if n > body.len() as u64 => {
            return Err(Error::invalid_reply(format!(
                "Declared length {} exceeds body length {}",
                n,
                body.len()
            )));
        }
        Some(n) => body.slice(..n as usize),
        None => body,
    };

    Response::full(status.unwrap_or(StatusCode::OK), content_type, body)
}

fn error_body(error: &Error, status: Option<StatusCode>) -> Result<Response> {
    if error.is_panic() {
        log::error!("Replying with the generic 500: {}", error);
        return Ok(Response::internal_error());
    }

    let status = status.unwrap_or_else(|| error.status_code());
    if status.is_server_error() {
        log::error!("Replying with error {}: {}", status.as_u16(), error);
    } else {
        log::debug!("Replying with error {}: {}", status.as_u16(), error);
    }

    let body = ErrorBody {
        code: status.as_u16(),
        error: status.canonical_reason().unwrap_or("Unknown"),
        message: error.message(),
    };
    let body = serde_json::to_vec(&body)?;

    Response::full(status, "application/json", Bytes::from(body))
}

async fn file_body(
    path: &Path,
    status: Option<StatusCode>,
    content_type: Option<String>,
    options: &ResolveOptions,
) -> Result<Response> {
    let full_path = if path.is_relative() {
        options.files_root.join(path)
    } else {
        path.to_path_buf()
    };

    let metadata = match tokio::fs::metadata(&full_path).await {
        Ok(metadata) if metadata.is_file() => metadata,
        Ok(_) => {
            log::debug!("Not a regular file: {}", full_path.display());
            return Ok(Response::empty(StatusCode::NOT_FOUND));
        }
        Err(e) => {
            log::debug!("File not available {}: {}", full_path.display(), e);
            return Ok(Response::empty(StatusCode::NOT_FOUND));
        }
    };

    let file = match tokio::fs::File::open(&full_path).await {
        Ok(file) => file,
        Err(e) => {
            log::debug!("Cannot open {}: {}", full_path.display(), e);
            return Ok(Response::empty(StatusCode::NOT_FOUND));
        }
    };

    // content-length is the stat size; a read failure midway cuts the body
    // short and the transport aborts the connection
    let content_type = content_type.unwrap_or_else(|| mime::from_path(&full_path).to_string());
    let length = metadata.len();
    let stream = ReplyStream::from_reader(file, options.chunk_size).bytes(length);

    let mut response = Response::stream(status.unwrap_or(StatusCode::OK), &content_type, stream)?;
    response.set_content_length(length);
    Ok(response)
}
