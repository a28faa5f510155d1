use hyper::StatusCode;
use std::any::Any;
use thiserror::Error;

pub mod context;

pub type Result<T> = std::result::Result<T, Error>;

pub use context::{ErrorChain, ErrorContext};

/// Main error type for hookway
#[derive(Error, Debug)]
pub enum Error {
    /// An error carrying an explicit HTTP status, typically produced by handlers
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Request already replied to")]
    AlreadyReplied,

    #[error("Invalid reply: {0}")]
    InvalidReply(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A hook, validator or handler panicked. Answered with the fixed 500.
    #[error("Panicked in {context}: {message}")]
    Panicked { context: String, message: String },

    // Error with context chain
    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Error with an explicit status code. Codes outside 100..=999 fall back to 500.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            message: message.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::FORBIDDEN,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::Status {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_reply(msg: impl Into<String>) -> Self {
        Self::InvalidReply(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Error for a caught panic, keeping the panic message when it has one
    pub fn from_panic(context: impl Into<String>, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::Panicked {
            context: context.into(),
            message,
        }
    }

    pub fn is_panic(&self) -> bool {
        match self {
            Error::Panicked { .. } => true,
            Error::WithContext { source, .. } => source.is_panic(),
            _ => false,
        }
    }

    // Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Message placed in the `message` field of error replies
    pub fn message(&self) -> String {
        match self {
            Error::Status { message, .. } => message.clone(),
            Error::Validation(msg) | Error::PayloadTooLarge(msg) | Error::Internal(msg) => {
                msg.clone()
            }
            Error::WithContext { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Status { .. } => "E_STATUS",
            Error::Config(_) => "E_CONFIG",
            Error::Validation(_) => "E_VALIDATION",
            Error::PayloadTooLarge(_) => "E_PAYLOAD_TOO_LARGE",
            Error::AlreadyReplied => "E_ALREADY_REPLIED",
            Error::InvalidReply(_) => "E_INVALID_REPLY",
            Error::Http(_) => "E_HTTP",
            Error::Json(_) => "E_JSON",
            Error::Io(_) => "E_IO",
            Error::Internal(_) => "E_INTERNAL",
            Error::Panicked { .. } => "E_PANIC",
            Error::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Status { status, .. } => *status,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Http(_) => StatusCode::BAD_REQUEST,
            Error::WithContext { source, .. } => source.status_code(),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
