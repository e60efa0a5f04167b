//! The send-a-request seam between the core and the host.
//!
//! # Design
//! The core never opens sockets. A `Transport` takes one fully-built
//! `HttpRequest` and returns the raw `HttpResponse`; status interpretation
//! stays in `classify`. Implementations may retry, pool connections or
//! enforce timeouts; the core neither sees nor duplicates that policy.
//!
//! `CachingTransport` is an optional decorator. List URIs are built
//! deterministically, so the full URI string together with the
//! `authorization` value works as a cache key. A different credential never
//! sees another credential's cached response.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes a single HTTP exchange.
///
/// Network-level failures are reported as `ApiError::Transport`. The
/// orchestration layer never calls `send` concurrently for one logical
/// operation.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        (**self).send(request, cancel).await
    }
}

/// Default number of cached responses before eviction starts.
pub const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// URI plus the `authorization` value the response was fetched with.
type CacheKey = (String, Option<String>);

/// Caches successful `GET` responses keyed on the request URI and credential.
///
/// Non-2xx responses are never stored. Any non-`GET` request passes through
/// and clears the cache, since a write may change what a list returns.
/// At most `capacity` responses are held; older entries are evicted.
pub struct CachingTransport<T> {
    inner: T,
    entries: Cache<CacheKey, HttpResponse>,
}

impl<T: Transport> CachingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: T, capacity: u64) -> Self {
        Self {
            inner,
            entries: Cache::builder().max_capacity(capacity).build(),
        }
    }

    /// Number of live entries, after pending evictions are applied.
    pub async fn len(&self) -> usize {
        self.entries.run_pending_tasks().await;
        usize::try_from(self.entries.entry_count()).unwrap_or(usize::MAX)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks().await;
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        if request.method != HttpMethod::Get {
            let response = self.inner.send(request, cancel).await?;
            self.clear().await;
            return Ok(response);
        }

        let key: CacheKey = (
            request.url.as_str().to_string(),
            request.header("authorization").map(str::to_string),
        );
        if let Some(hit) = self.entries.get(&key).await {
            tracing::debug!(uri = %key.0, "response cache hit");
            return Ok(hit);
        }

        let response = self.inner.send(request, cancel).await?;
        if response.is_success() {
            self.entries.insert(key, response.clone()).await;
        }
        Ok(response)
    }
}
