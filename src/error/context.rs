//! Error context and chaining utilities
//!
//! Handlers and hooks wrap lower-level failures with context; the lifecycle
//! logs the whole chain while only the outermost message reaches the client.

use super::Error;
use std::fmt;

/// Trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to the error
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>;

    /// Add context with lazy evaluation
    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn context<C>(self, context: C) -> Result<T, Error>
    where
        C: Into<String>,
    {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T, Error>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

/// Flattened view of a `WithContext` chain
pub struct ErrorChain<'a> {
    error: &'a Error,
    chain: Vec<String>,
}

impl<'a> ErrorChain<'a> {
    pub fn new(error: &'a Error) -> Self {
        let mut chain = Vec::new();
        let mut current = error;
        loop {
            chain.push(current.to_string());
            match current {
                Error::WithContext { source, .. } => current = &**source,
                _ => break,
            }
        }
        Self { error, chain }
    }

    pub fn chain(&self) -> &[String] {
        &self.chain
    }

    /// Innermost error of the chain
    pub fn root_cause(&self) -> &Error {
        let mut current = self.error;
        while let Error::WithContext { source, .. } = current {
            current = &**source;
        }
        current
    }

    pub fn format_for_log(&self) -> String {
        self.chain.join(" -> ")
    }
}

impl<'a> fmt::Display for ErrorChain<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_for_log())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_chain_formatting() {
        let error = Error::internal("disk on fire")
            .with_context("reading template")
            .with_context("rendering page");

        let chain = ErrorChain::new(&error);

        assert_eq!(chain.chain().len(), 3);
        assert_eq!(
            chain.format_for_log(),
            "rendering page -> reading template -> Internal error: disk on fire"
        );
        assert!(matches!(chain.root_cause(), Error::Internal(_)));
    }

    #[test]
    fn test_result_context_converts_foreign_errors() {
        let io: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "gone",
        ));

        let err = io.context("opening upload").unwrap_err();
        assert_eq!(err.message(), "opening upload");
        assert!(matches!(ErrorChain::new(&err).root_cause(), Error::Io(_)));
    }
}
