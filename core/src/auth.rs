//! Bearer credential supply.
//!
//! Token refresh and rotation happen outside this crate. A `TokenSource`
//! hands out whatever token is current; when the API answers 401/403 the
//! client surfaces `ErrorKind::Authorization` and the caller decides whether
//! to refresh and retry.

use std::fmt;

use crate::error::ApiError;

/// Supplies the bearer token for each request.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<String, ApiError>;
}

/// A fixed access token that never shows up in `Debug` or `Display` output.
#[derive(Clone)]
pub struct StaticToken {
    inner: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            inner: token.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inner.trim().is_empty()
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<String, ApiError> {
        if self.is_empty() {
            return Err(ApiError::Authorization("no access token configured".to_string()));
        }
        Ok(self.inner.clone())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StaticToken([REDACTED])")
    }
}

impl fmt::Display for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED TOKEN]")
    }
}
