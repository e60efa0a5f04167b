//! The resource-agnostic client that resource operations are built on.
//!
//! # Design
//! `CrmClient` owns the configuration and two shared collaborators: the
//! `Transport` that performs I/O and the `TokenSource` that supplies the
//! bearer token. Its generic helpers (`list_pages`, `fetch_one`,
//! `write_batch`) wire the query builder, the pagination and batch engines
//! and the classifier together; per-resource modules only add paths,
//! payload shapes and selectors.
//!
//! Each top-level operation logs its start and outcome with the tenant and
//! an operation id. Failures are wrapped in `ApiError::Context` without
//! changing their kind.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::auth::TokenSource;
use crate::batch;
use crate::classify::classify;
use crate::config::{ClientConfig, ConfigError};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::paginate;
use crate::query::{build_list_uri, join_linked, LinkedEntity, ListFilter, ListQuery, ResourceUri};
use crate::transport::Transport;
use crate::types::Page;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Client for one CRM account (tenant).
#[derive(Clone)]
pub struct CrmClient {
    config: ClientConfig,
    api_root: Url,
    transport: Arc<dyn Transport>,
    credentials: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for CrmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmClient")
            .field("tenant", &self.config.subdomain)
            .field("api_root", &self.api_root.as_str())
            .finish_non_exhaustive()
    }
}

/// Start/finish bookkeeping for one top-level operation.
struct Operation<'a> {
    name: &'static str,
    tenant: &'a str,
    id: Uuid,
}

impl<'a> Operation<'a> {
    fn start(name: &'static str, tenant: &'a str) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(operation = name, tenant, op_id = %id, "operation started");
        Self { name, tenant, id }
    }

    /// Like `start`, recording how many items the write carries.
    fn start_write(name: &'static str, tenant: &'a str, items: usize) -> Self {
        let id = Uuid::new_v4();
        tracing::info!(operation = name, tenant, op_id = %id, items, "operation started");
        Self { name, tenant, id }
    }

    fn finish<T>(
        &self,
        result: Result<T, ApiError>,
        count: impl FnOnce(&T) -> usize,
    ) -> Result<T, ApiError> {
        match result {
            Ok(value) => {
                tracing::info!(
                    operation = self.name,
                    tenant = self.tenant,
                    op_id = %self.id,
                    count = count(&value),
                    "operation completed"
                );
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(
                    operation = self.name,
                    tenant = self.tenant,
                    op_id = %self.id,
                    kind = ?e.kind(),
                    error = %e,
                    "operation failed"
                );
                Err(e.in_operation(self.name, self.tenant))
            }
        }
    }
}

impl CrmClient {
    pub fn new(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn TokenSource>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let api_root = config.api_root()?;
        Ok(Self {
            config,
            api_root,
            transport,
            credentials,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Tenant identifier used in logs and error context.
    pub fn tenant(&self) -> &str {
        &self.config.subdomain
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    /// URI of `path` with no query parameters.
    pub fn resource_uri(&self, path: &str) -> Result<ResourceUri, ApiError> {
        ResourceUri::for_path(&self.api_root, path)
    }

    /// First-page URI of a list request, using the configured page size.
    pub fn list_uri(
        &self,
        path: &str,
        query: &ListQuery,
        filter: &dyn ListFilter,
    ) -> Result<ResourceUri, ApiError> {
        build_list_uri(&self.api_root, path, query, filter, self.config.page_size)
    }

    /// URI of `path/<id>`, with `with` rendered when non-empty.
    pub fn entity_uri(
        &self,
        path: &str,
        id: impl std::fmt::Display,
        with: &[LinkedEntity],
    ) -> Result<ResourceUri, ApiError> {
        let mut uri = self.resource_uri(&format!("{path}/{id}"))?;
        if !with.is_empty() {
            uri.params_mut().push("with", join_linked(with));
        }
        Ok(uri)
    }

    fn build_request(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<String>,
    ) -> Result<HttpRequest, ApiError> {
        let token = self.credentials.access_token()?;
        let mut headers = vec![
            ("authorization".to_string(), format!("Bearer {token}")),
            ("accept".to_string(), JSON_CONTENT_TYPE.to_string()),
        ];
        if body.is_some() {
            headers.push(("content-type".to_string(), JSON_CONTENT_TYPE.to_string()));
        }
        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// One round-trip through the transport. The response is tagged with the
    /// request echo unless the transport already set one.
    pub async fn send(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<String>,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        let request = self.build_request(method, url, body)?;
        let echo = request.describe();
        tracing::debug!(request = %echo, "sending request");
        let response = self.transport.send(request, cancel).await?;
        if response.request_echo.is_some() {
            return Ok(response);
        }
        Ok(response.with_request_echo(echo))
    }

    /// Fetch every page starting at `uri` and collect what `select` picks
    /// from each page's `_embedded` block.
    pub async fn list_pages<E, T>(
        &self,
        operation: &'static str,
        uri: &ResourceUri,
        mut select: impl FnMut(E) -> Vec<T>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, ApiError>
    where
        E: DeserializeOwned,
    {
        let op = Operation::start(operation, self.tenant());
        let result = paginate::traverse(
            uri.to_url(),
            cancel,
            |url| self.send(HttpMethod::Get, url, None, cancel),
            Page::<E>::next_link,
            |page: Page<E>| select(page.embedded),
        )
        .await;
        op.finish(result, Vec::len)
    }

    /// GET a single object. A 204 yields `None`.
    pub async fn fetch_one<T>(
        &self,
        operation: &'static str,
        uri: &ResourceUri,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
    {
        let op = Operation::start(operation, self.tenant());
        let result = self.get_classified(uri, cancel).await;
        op.finish(result, |found| usize::from(found.is_some()))
    }

    async fn get_classified<T: DeserializeOwned>(
        &self,
        uri: &ResourceUri,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let response = self.send(HttpMethod::Get, uri.to_url(), None, cancel).await?;
        classify::<T>(&response).into_result()
    }

    /// Send `requests` to `path` in chunks of the configured batch size and
    /// collect what `select` picks from each chunk's `_embedded` block.
    ///
    /// `method` is `Post` for creates and `Patch` for updates.
    pub async fn write_batch<R, E, T>(
        &self,
        operation: &'static str,
        method: HttpMethod,
        path: &str,
        requests: Option<&[R]>,
        mut select: impl FnMut(E) -> Vec<T>,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, ApiError>
    where
        R: Serialize,
        E: DeserializeOwned,
    {
        let items = requests.map_or(0, <[R]>::len);
        let op = Operation::start_write(operation, self.tenant(), items);
        let result = match self.resource_uri(path) {
            Ok(uri) => {
                let url = uri.to_url();
                batch::batch_write(
                    requests,
                    self.config.batch_size,
                    cancel,
                    |body| self.send(method, url.clone(), Some(body), cancel),
                    |page: Page<E>| select(page.embedded),
                )
                .await
            }
            Err(e) => Err(e),
        };
        op.finish(result, Vec::len)
    }

    /// One unchunked POST of `body` to `path`. A 204 yields `None`.
    pub async fn post_one<R, T>(
        &self,
        operation: &'static str,
        path: &str,
        body: &R,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ApiError>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let op = Operation::start(operation, self.tenant());
        let result = self.post_classified(path, body, cancel).await;
        op.finish(result, |found| usize::from(found.is_some()))
    }

    async fn post_classified<R, T>(
        &self,
        path: &str,
        body: &R,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, ApiError>
    where
        R: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let uri = self.resource_uri(path)?;
        let body = serde_json::to_string(body)
            .map_err(|e| ApiError::PreconditionViolation(format!("payload not serializable: {e}")))?;
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let response = self
            .send(HttpMethod::Post, uri.to_url(), Some(body), cancel)
            .await?;
        classify::<T>(&response).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::error::ErrorKind;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::sync::Mutex;

    /// Replays canned responses and records every request.
    #[derive(Default)]
    struct Scripted {
        responses: Mutex<Vec<HttpResponse>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<HttpResponse>) -> Arc<Self> {
            responses.reverse();
            Arc::new(Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<HttpRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(
            &self,
            request: HttpRequest,
            _cancel: &CancellationToken,
        ) -> Result<HttpResponse, ApiError> {
            self.seen.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| ApiError::Transport("script exhausted".to_string()))
        }
    }

    #[derive(Debug, Deserialize)]
    struct Embedded {
        items: Vec<u32>,
    }

    fn client(transport: Arc<Scripted>) -> CrmClient {
        CrmClient::new(
            ClientConfig::new("acme"),
            transport,
            Arc::new(StaticToken::new("t0ken")),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn requests_carry_bearer_and_json_headers() {
        let transport = Scripted::new(vec![HttpResponse::new(204, "")]);
        let c = client(transport.clone());
        let uri = c.resource_uri("leads").unwrap();
        c.write_batch::<u32, Embedded, u32>(
            "create_items",
            HttpMethod::Post,
            "leads",
            Some(&[1, 2][..]),
            |e| e.items,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let seen = transport.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].url, uri.to_url());
        assert_eq!(seen[0].header("authorization"), Some("Bearer t0ken"));
        assert_eq!(seen[0].header("content-type"), Some("application/json"));
        assert_eq!(seen[0].body.as_deref(), Some("[1,2]"));
    }

    #[tracing_test::traced_test]
    #[tokio::test]
    async fn batch_start_logs_item_count() {
        let transport = Scripted::new(vec![HttpResponse::new(
            200,
            r#"{"_embedded":{"items":[10,11,12]}}"#,
        )]);
        let c = client(transport);
        c.write_batch::<u32, Embedded, u32>(
            "create_items",
            HttpMethod::Post,
            "leads",
            Some(&[1, 2, 3][..]),
            |e| e.items,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(logs_contain("items=3"));
        assert!(logs_contain("count=3"));
    }

    #[tokio::test]
    async fn get_requests_have_no_content_type() {
        let transport = Scripted::new(vec![HttpResponse::new(200, r#"{"_embedded":{"items":[4]}}"#)]);
        let c = client(transport.clone());
        let uri = c.list_uri("leads", &ListQuery::new(), &()).unwrap();
        let items = c
            .list_pages("list_items", &uri, |e: Embedded| e.items, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(items, vec![4]);
        let seen = transport.seen();
        assert_eq!(seen[0].header("content-type"), None);
        assert_eq!(
            seen[0].url.as_str(),
            "https://acme.kommo.com/api/v4/leads?page=1&limit=250"
        );
    }

    #[tokio::test]
    async fn failures_carry_operation_context() {
        let transport = Scripted::new(vec![HttpResponse::new(403, "")]);
        let c = client(transport);
        let uri = c.resource_uri("account").unwrap();
        let err = c
            .fetch_one::<serde_json::Value>("get_account", &uri, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert_eq!(
            err.to_string(),
            "get_account failed for tenant acme: authorization failed: access forbidden"
        );
    }

    #[tokio::test]
    async fn missing_token_fails_before_sending() {
        let transport = Scripted::new(Vec::new());
        let c = CrmClient::new(
            ClientConfig::new("acme"),
            transport.clone(),
            Arc::new(StaticToken::new("")),
        )
        .unwrap();
        let uri = c.resource_uri("account").unwrap();
        let err = c
            .fetch_one::<serde_json::Value>("get_account", &uri, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authorization);
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn absent_batch_is_precondition_violation() {
        let transport = Scripted::new(Vec::new());
        let c = client(transport.clone());
        let err = c
            .write_batch::<u32, Embedded, u32>(
                "create_items",
                HttpMethod::Post,
                "leads",
                None,
                |e| e.items,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
        assert!(transport.seen().is_empty());
    }

    #[test]
    fn entity_uri_appends_id_and_with() {
        let c = client(Scripted::new(Vec::new()));
        let uri = c
            .entity_uri("leads", 42, &[LinkedEntity::Contacts, LinkedEntity::LossReason])
            .unwrap();
        assert_eq!(
            uri.to_string(),
            "https://acme.kommo.com/api/v4/leads/42?with=contacts%2Closs_reason"
        );
        let bare = c.entity_uri("widgets", "amo_forms", &[]).unwrap();
        assert_eq!(bare.to_string(), "https://acme.kommo.com/api/v4/widgets/amo_forms");
    }

    #[tokio::test]
    async fn post_one_sends_single_body() {
        let transport = Scripted::new(vec![HttpResponse::new(204, "")]);
        let c = client(transport.clone());
        let found = c
            .post_one::<[u32], serde_json::Value>(
                "unlink_items",
                "leads/unlink",
                &[7, 8, 9][..],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(found.is_none());
        let seen = transport.seen();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url.as_str(), "https://acme.kommo.com/api/v4/leads/unlink");
        assert_eq!(seen[0].body.as_deref(), Some("[7,8,9]"));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = CrmClient::new(
            ClientConfig::new(""),
            Scripted::new(Vec::new()),
            Arc::new(StaticToken::new("t")),
        );
        assert!(result.is_err());
    }
}
