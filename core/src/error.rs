//! Error types for the CRM client.
//!
//! # Design
//! Every failure falls into one of four `ErrorKind`s so callers can pick a
//! policy without looking at status codes: refresh credentials and retry
//! (`Authorization`), fix the payload (`Validation`), retry later or alert
//! (`Transport`), or fix the calling code (`PreconditionViolation`).
//! `Context` adds the operation and tenant to a failure without changing its
//! kind.

use thiserror::Error;

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Credential missing, expired or insufficient.
    Authorization,
    /// The API rejected the request as malformed or semantically invalid.
    Validation,
    /// Empty/unparseable body, unexpected status, network failure.
    Transport,
    /// The caller broke a contract before any request was issued.
    PreconditionViolation,
}

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// Carries whatever detail the API provided.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("precondition violated: {0}")]
    PreconditionViolation(String),

    /// The cancellation token fired before the next request was issued.
    #[error("operation cancelled")]
    Cancelled,

    #[error("{operation} failed for tenant {tenant}: {source}")]
    Context {
        operation: &'static str,
        tenant: String,
        #[source]
        source: Box<ApiError>,
    },
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Authorization(_) => ErrorKind::Authorization,
            ApiError::Validation(_) => ErrorKind::Validation,
            ApiError::Transport(_) | ApiError::Cancelled => ErrorKind::Transport,
            ApiError::PreconditionViolation(_) => ErrorKind::PreconditionViolation,
            ApiError::Context { source, .. } => source.kind(),
        }
    }

    /// Build the error for a classified failure.
    pub fn from_kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Authorization => ApiError::Authorization(message),
            ErrorKind::Validation => ApiError::Validation(message),
            ErrorKind::Transport => ApiError::Transport(message),
            ErrorKind::PreconditionViolation => ApiError::PreconditionViolation(message),
        }
    }

    /// Wrap with operation and tenant. Already-wrapped errors are returned
    /// unchanged so nested operations don't stack contexts.
    #[must_use]
    pub fn in_operation(self, operation: &'static str, tenant: &str) -> Self {
        match self {
            ApiError::Context { .. } => self,
            other => ApiError::Context {
                operation,
                tenant: tenant.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, past any `Context` wrapper.
    pub fn root(&self) -> &ApiError {
        match self {
            ApiError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), ApiError::Cancelled)
    }
}
