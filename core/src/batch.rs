//! Bounded-size batch writes.
//!
//! # Design
//! A write collection is cut into size-bounded chunks, one request per
//! chunk, sent strictly in order. The first failing chunk aborts the whole
//! operation. Chunks already accepted upstream are not rolled back, and their
//! results are not returned: the caller sees either every result or an
//! error.
//!
//! All chunk bodies are serialized before the first request, so a payload
//! that cannot be encoded is reported without anything being sent.

use std::future::Future;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::classify::{classify, Classified};
use crate::error::ApiError;
use crate::http::HttpResponse;

/// Split `requests` into consecutive slices of at most `chunk_size` items.
///
/// Concatenating the returned slices reproduces `requests` exactly. An empty
/// input yields no chunks.
pub fn chunk_requests<R>(requests: &[R], chunk_size: usize) -> Result<Vec<&[R]>, ApiError> {
    if chunk_size == 0 {
        return Err(ApiError::PreconditionViolation(
            "chunk size must be at least 1".to_string(),
        ));
    }
    Ok(requests.chunks(chunk_size).collect())
}

/// Write `requests` in chunks of `chunk_size`, returning every chunk's items
/// in chunk order.
///
/// `None` means the caller passed no collection at all; that is a
/// `PreconditionViolation` raised before any request. `Some(&[])` returns an
/// empty result without calling `send`. A 204 chunk response contributes no
/// items.
pub async fn batch_write<R, P, T, F, Fut, I>(
    requests: Option<&[R]>,
    chunk_size: usize,
    cancel: &CancellationToken,
    mut send: F,
    mut items: I,
) -> Result<Vec<T>, ApiError>
where
    R: Serialize,
    P: DeserializeOwned,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<HttpResponse, ApiError>>,
    I: FnMut(P) -> Vec<T>,
{
    let requests = requests.ok_or_else(|| {
        ApiError::PreconditionViolation("request collection is absent".to_string())
    })?;
    let chunks = chunk_requests(requests, chunk_size)?;
    if chunks.is_empty() {
        return Ok(Vec::new());
    }

    let bodies = chunks
        .iter()
        .map(|chunk| serde_json::to_string(chunk))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::PreconditionViolation(format!("payload not serializable: {e}")))?;

    let total = bodies.len();
    let mut collected = Vec::with_capacity(requests.len());

    for (index, body) in bodies.into_iter().enumerate() {
        let chunk = index + 1;
        if cancel.is_cancelled() {
            tracing::warn!(chunk, total, "batch cancelled before chunk {chunk} of {total}");
            return Err(ApiError::Cancelled);
        }

        let response = send(body).await.inspect_err(|e| {
            tracing::warn!(chunk, total, error = %e, "chunk {chunk} of {total} not delivered");
        })?;

        match classify::<P>(&response) {
            Classified::Failed { kind, message } => {
                tracing::warn!(chunk, total, ?kind, "chunk {chunk} of {total} rejected");
                return Err(ApiError::from_kind(kind, message));
            }
            Classified::Empty => {}
            Classified::Ok(page) => collected.extend(items(page)),
        }
    }

    tracing::debug!(chunks = total, items = collected.len(), "batch finished");
    Ok(collected)
}
