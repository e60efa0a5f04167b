//! Next-link pagination traversal.
//!
//! # Design
//! The engine knows nothing about resources. The caller supplies how to send
//! a request for a URL, how to find the next link in a page, and how to
//! project a page onto its items. Pages are fetched strictly one after
//! another; each next link is only known once the current page is decoded.
//!
//! Failure is all-or-nothing: the first page that fails classification ends
//! the traversal and the items gathered so far are dropped.

use std::future::Future;

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::classify::{classify, Classified};
use crate::error::ApiError;
use crate::http::HttpResponse;

/// Follow next-page links from `initial` until a page has none.
///
/// Items are concatenated in page order, then in-page order, with no
/// deduplication. A 204 page counts as zero items and ends the traversal.
/// The token is checked before every request; once cancelled, no further
/// request is started and `ApiError::Cancelled` is returned.
pub async fn traverse<P, T, F, Fut, N, I>(
    initial: Url,
    cancel: &CancellationToken,
    mut send: F,
    next_link: N,
    mut items: I,
) -> Result<Vec<T>, ApiError>
where
    P: DeserializeOwned,
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<HttpResponse, ApiError>>,
    N: Fn(&P) -> Option<Url>,
    I: FnMut(P) -> Vec<T>,
{
    let mut collected = Vec::new();
    let mut pending = Some(initial);
    let mut pages: usize = 0;

    while let Some(url) = pending.take() {
        if cancel.is_cancelled() {
            tracing::debug!(pages, "traversal cancelled before next page");
            return Err(ApiError::Cancelled);
        }

        let response = send(url).await?;
        pages += 1;

        match classify::<P>(&response) {
            Classified::Failed { kind, message } => {
                tracing::debug!(page = pages, ?kind, "traversal aborted");
                return Err(ApiError::from_kind(kind, message));
            }
            Classified::Empty => break,
            Classified::Ok(page) => {
                pending = next_link(&page);
                collected.extend(items(page));
            }
        }
    }

    tracing::debug!(pages, items = collected.len(), "traversal finished");
    Ok(collected)
}
