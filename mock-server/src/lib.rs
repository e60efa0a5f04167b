//! In-memory stand-in for the CRM's v4 REST API.
//!
//! Serves `/api/v4/{resource}` collections with bearer-token auth, paged
//! lists carrying absolute next links, batched creates and updates, and the
//! API's status conventions: 204 for an empty list or missing entity, 400
//! with a `detail` for rejected payloads, 401 for a bad token.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_PREFIX: &str = "/api/v4";
pub const DEFAULT_TOKEN: &str = "mock-token";
pub const MAX_LIMIT: usize = 250;

/// Records per resource, in insertion order.
#[derive(Debug, Default)]
pub struct Store {
    collections: HashMap<String, Vec<Map<String, Value>>>,
    next_id: u64,
}

impl Store {
    fn insert(&mut self, resource: &str, mut record: Map<String, Value>) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        record.insert("id".to_string(), json!(id));
        self.collections
            .entry(resource.to_string())
            .or_default()
            .push(record);
        id
    }

    fn find_mut(&mut self, resource: &str, id: u64) -> Option<&mut Map<String, Value>> {
        self.collections
            .get_mut(resource)?
            .iter_mut()
            .find(|r| record_id(r) == Some(id))
    }
}

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    /// Origin used in `_links`, e.g. `http://127.0.0.1:3000`.
    public_base: Arc<str>,
    store: Arc<RwLock<Store>>,
}

impl AppState {
    pub fn new(token: &str, public_base: &str) -> Self {
        Self {
            token: token.into(),
            public_base: public_base.trim_end_matches('/').into(),
            store: Arc::new(RwLock::new(Store::default())),
        }
    }

    /// Insert `records` (JSON objects) into `resource`, assigning ids.
    /// Non-object values are skipped.
    pub async fn seed(&self, resource: &str, records: Vec<Value>) -> Vec<u64> {
        let mut store = self.store.write().await;
        records
            .into_iter()
            .filter_map(|value| match value {
                Value::Object(record) => Some(store.insert(resource, record)),
                _ => None,
            })
            .collect()
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/v4/{resource}",
            get(list_records).post(create_records).patch(update_records),
        )
        .route("/api/v4/{resource}/{id}", get(get_record))
        .with_state(state)
}

/// Serve on `listener` with `token`, advertising the listener's own address
/// in next links.
pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    serve(listener, AppState::new(token, &format!("http://{addr}"))).await
}

/// Serve an existing state, e.g. one a test has seeded.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app(state)).await
}

fn record_id(record: &Map<String, Value>) -> Option<u64> {
    record.get("id").and_then(Value::as_u64)
}

fn problem(status: StatusCode, title: &str, detail: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "title": title,
            "status": status.as_u16(),
            "detail": detail.into(),
        })),
    )
        .into_response()
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match presented {
        Some(token) if token == &*state.token => Ok(()),
        _ => {
            tracing::info!("rejected request with missing or wrong token");
            Err(problem(StatusCode::UNAUTHORIZED, "Unauthorized", "token invalid"))
        }
    }
}

/// Parsed list parameters: `page`, `limit`, `query`, `filter[id][n]`.
struct ListParams {
    page: usize,
    limit: usize,
    search: Option<String>,
    ids: Vec<u64>,
}

impl ListParams {
    fn parse(pairs: &[(String, String)]) -> Result<Self, Response> {
        let mut params = ListParams {
            page: 1,
            limit: MAX_LIMIT,
            search: None,
            ids: Vec::new(),
        };
        for (key, value) in pairs {
            let bad = || problem(StatusCode::BAD_REQUEST, "Bad Request", format!("invalid {key}"));
            match key.as_str() {
                "page" => params.page = value.parse().map_err(|_| bad())?,
                "limit" => params.limit = value.parse().map_err(|_| bad())?,
                "query" => params.search = Some(value.to_lowercase()),
                k if k.starts_with("filter[id]") => params.ids.push(value.parse().map_err(|_| bad())?),
                _ => {}
            }
        }
        if params.page == 0 || params.limit == 0 || params.limit > MAX_LIMIT {
            return Err(problem(
                StatusCode::BAD_REQUEST,
                "Bad Request",
                format!("page must be >= 1 and limit 1-{MAX_LIMIT}"),
            ));
        }
        Ok(params)
    }

    fn matches(&self, record: &Map<String, Value>) -> bool {
        if !self.ids.is_empty() && !record_id(record).is_some_and(|id| self.ids.contains(&id)) {
            return false;
        }
        match &self.search {
            Some(text) => record
                .values()
                .filter_map(Value::as_str)
                .any(|v| v.to_lowercase().contains(text)),
            None => true,
        }
    }
}

/// Replace the `page` pair of a raw query string, keeping everything else
/// byte-for-byte.
fn with_page(raw_query: &str, page: usize) -> String {
    let mut replaced = false;
    let mut parts: Vec<String> = raw_query
        .split('&')
        .filter(|p| !p.is_empty())
        .map(|p| {
            if p.starts_with("page=") {
                replaced = true;
                format!("page={page}")
            } else {
                p.to_string()
            }
        })
        .collect();
    if !replaced {
        parts.push(format!("page={page}"));
    }
    parts.join("&")
}

async fn list_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    RawQuery(raw): RawQuery,
    Query(pairs): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = authorize(&state, &headers) {
        return rejected;
    }
    let params = match ListParams::parse(&pairs) {
        Ok(params) => params,
        Err(rejected) => return rejected,
    };

    let store = state.store.read().await;
    let matching: Vec<&Map<String, Value>> = store
        .collections
        .get(&resource)
        .map(|records| records.iter().filter(|r| params.matches(r)).collect())
        .unwrap_or_default();

    let start = (params.page - 1).saturating_mul(params.limit);
    let items: Vec<&Map<String, Value>> =
        matching.iter().skip(start).take(params.limit).copied().collect();
    tracing::info!(%resource, page = params.page, count = items.len(), "list");
    if items.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let raw = raw.unwrap_or_default();
    let href = |page: usize| {
        json!({ "href": format!("{}{API_PREFIX}/{resource}?{}", state.public_base, with_page(&raw, page)) })
    };
    let mut links = Map::new();
    links.insert("self".to_string(), href(params.page));
    if start + items.len() < matching.len() {
        links.insert("next".to_string(), href(params.page + 1));
    }
    if params.page > 1 {
        links.insert("prev".to_string(), href(params.page - 1));
    }

    Json(json!({
        "_page": params.page,
        "_links": links,
        "_embedded": { resource.as_str(): items },
    }))
    .into_response()
}

async fn get_record(
    State(state): State<AppState>,
    Path((resource, id)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Err(rejected) = authorize(&state, &headers) {
        return rejected;
    }
    let Ok(id) = id.parse::<u64>() else {
        return problem(StatusCode::BAD_REQUEST, "Bad Request", "id must be numeric");
    };
    let store = state.store.read().await;
    let found = store
        .collections
        .get(&resource)
        .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)));
    match found {
        Some(record) => Json(record).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

/// Decode a write body: a JSON array of objects.
fn parse_batch(body: &str) -> Result<Vec<Map<String, Value>>, Response> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        problem(StatusCode::BAD_REQUEST, "Bad Request", format!("malformed JSON: {e}"))
    })?;
    let Value::Array(items) = value else {
        return Err(problem(StatusCode::BAD_REQUEST, "Bad Request", "body must be an array"));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(record) => Ok(record),
            _ => Err(validation_failure(index, "item must be an object")),
        })
        .collect()
}

fn validation_failure(index: usize, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "title": "Bad Request",
            "status": 400,
            "detail": "Request validation failed",
            "validation-errors": [{
                "request_id": index.to_string(),
                "errors": [{ "path": format!("{index}"), "detail": message }],
            }],
        })),
    )
        .into_response()
}

async fn create_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(rejected) = authorize(&state, &headers) {
        return rejected;
    }
    let records = match parse_batch(&body) {
        Ok(records) => records,
        Err(rejected) => return rejected,
    };
    if let Some(index) = records
        .iter()
        .position(|r| r.get("name").is_some_and(|n| n.as_str().is_none_or(str::is_empty)))
    {
        return validation_failure(index, "name must be a non-empty string");
    }

    let mut store = state.store.write().await;
    let results: Vec<Value> = records
        .into_iter()
        .map(|record| {
            let request_id = record.get("request_id").cloned();
            let id = store.insert(&resource, record);
            match request_id {
                Some(request_id) => json!({ "id": id, "request_id": request_id }),
                None => json!({ "id": id }),
            }
        })
        .collect();
    tracing::info!(%resource, count = results.len(), "created");

    Json(json!({ "_embedded": { resource.as_str(): results } })).into_response()
}

async fn update_records(
    State(state): State<AppState>,
    Path(resource): Path<String>,
    headers: HeaderMap,
    body: String,
) -> Response {
    if let Err(rejected) = authorize(&state, &headers) {
        return rejected;
    }
    let updates = match parse_batch(&body) {
        Ok(updates) => updates,
        Err(rejected) => return rejected,
    };

    let mut store = state.store.write().await;
    for (index, update) in updates.iter().enumerate() {
        let known = record_id(update).is_some_and(|id| store.find_mut(&resource, id).is_some());
        if !known {
            return validation_failure(index, "unknown id");
        }
    }
    let results: Vec<Value> = updates
        .into_iter()
        .filter_map(|update| {
            let id = record_id(&update)?;
            let record = store.find_mut(&resource, id)?;
            record.extend(update);
            Some(json!({ "id": id }))
        })
        .collect();
    tracing::info!(%resource, count = results.len(), "updated");

    Json(json!({ "_embedded": { resource.as_str(): results } })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_is_replaced_in_place() {
        assert_eq!(with_page("query=acme&page=1&limit=1", 2), "query=acme&page=2&limit=1");
        assert_eq!(with_page("limit=5", 3), "limit=5&page=3");
        assert_eq!(with_page("", 2), "page=2");
    }

    #[test]
    fn search_matches_any_string_field_case_insensitively() {
        let params = ListParams::parse(&[("query".to_string(), "ACME".to_string())]).unwrap();
        let mut record = Map::new();
        record.insert("name".to_string(), json!("Acme deal"));
        assert!(params.matches(&record));
        record.insert("name".to_string(), json!("Globex"));
        assert!(!params.matches(&record));
    }

    #[test]
    fn oversized_limit_is_rejected() {
        let result = ListParams::parse(&[("limit".to_string(), "251".to_string())]);
        assert!(result.is_err());
    }

    #[test]
    fn batch_body_must_be_array_of_objects() {
        assert!(parse_batch(r#"[{"name":"a"}]"#).is_ok());
        assert!(parse_batch(r#"{"name":"a"}"#).is_err());
        assert!(parse_batch("[1]").is_err());
        assert!(parse_batch("not json").is_err());
    }

    #[tokio::test]
    async fn seed_assigns_increasing_ids() {
        let state = AppState::new(DEFAULT_TOKEN, "http://mock.test");
        let ids = state
            .seed("leads", vec![json!({"name": "a"}), json!(5), json!({"name": "b"})])
            .await;
        assert_eq!(ids, vec![1, 2]);
    }
}
