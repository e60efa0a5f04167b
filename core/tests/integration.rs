//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `CrmClient` over real
//! HTTP through a ureq-backed `Transport`. Validates that URI building,
//! classification, next-link traversal and chunked writes agree with an
//! actual server.

use std::sync::Arc;

use async_trait::async_trait;
use crm_core::resources::{ContactFilter, DealFilter, DealUpdate, NewContact, NewDeal};
use crm_core::{
    ApiError, CachingTransport, ClientConfig, CrmClient, ErrorKind, HttpMethod, HttpRequest,
    HttpResponse, ListQuery, StaticToken, Transport,
};
use mock_server::AppState;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "integration-token";

/// Executes requests with ureq on the blocking pool.
///
/// ureq's status-as-error behavior is disabled so 4xx/5xx responses come back
/// as data and the core does the status interpretation.
#[derive(Clone)]
struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn execute(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, ApiError> {
    let url = request.url.as_str();
    let body = request.body.unwrap_or_default();
    let result = match request.method {
        HttpMethod::Get => with_headers(agent.get(url), &request.headers).call(),
        HttpMethod::Delete => with_headers(agent.delete(url), &request.headers).call(),
        HttpMethod::Post => with_headers(agent.post(url), &request.headers).send(body.as_bytes()),
        HttpMethod::Patch => with_headers(agent.patch(url), &request.headers).send(body.as_bytes()),
    };
    let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    let body = response.body_mut().read_to_string().unwrap_or_default();

    Ok(HttpResponse {
        status,
        headers,
        body,
        request_echo: None,
    })
}

#[async_trait]
impl Transport for UreqTransport {
    async fn send(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || execute(&agent, request))
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?
    }
}

/// Start the mock server on a random port and return its state and origin.
fn start_server() -> (AppState, String) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let origin = format!("http://{addr}");
    let state = AppState::new(TOKEN, &origin);
    let served = state.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, served).await
        })
        .unwrap();
    });

    (state, origin)
}

fn config(origin: &str) -> ClientConfig {
    ClientConfig::new("acme").with_origin(origin)
}

fn client_with(config: ClientConfig, transport: Arc<dyn Transport>, token: &str) -> CrmClient {
    CrmClient::new(config, transport, Arc::new(StaticToken::new(token))).unwrap()
}

#[tokio::test]
async fn search_follows_next_links_across_pages() {
    let (state, origin) = start_server();
    state
        .seed(
            "leads",
            vec![
                json!({"name": "Acme renewal", "price": 100}),
                json!({"name": "Globex pilot", "price": 5}),
                json!({"name": "acme expansion", "price": 250}),
            ],
        )
        .await;

    let caching = Arc::new(CachingTransport::new(UreqTransport::new()));
    let mut cfg = config(&origin);
    cfg.page_size = 1;
    let client = client_with(cfg, caching.clone(), TOKEN);

    let deals = client
        .list_deals(
            &ListQuery::new().search("acme"),
            &DealFilter::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let names: Vec<&str> = deals.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["Acme renewal", "acme expansion"]);
    assert_eq!(deals[1].price, Some(250));
    // one cache entry per distinct page fetched
    assert_eq!(caching.len().await, 2);
}

#[tokio::test]
async fn empty_collection_lists_as_empty() {
    let (_state, origin) = start_server();
    let client = client_with(config(&origin), Arc::new(UreqTransport::new()), TOKEN);
    let contacts = client
        .list_contacts(&ListQuery::new(), &ContactFilter::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert!(contacts.is_empty());
}

#[tokio::test]
async fn batch_create_sends_one_request_per_chunk() {
    let (_state, origin) = start_server();
    let mut cfg = config(&origin);
    cfg.batch_size = 1;
    let client = client_with(cfg, Arc::new(UreqTransport::new()), TOKEN);

    let deals: Vec<NewDeal> = ["first", "second", "third"]
        .iter()
        .map(|name| NewDeal {
            name: name.to_string(),
            request_id: Some(format!("req-{name}")),
            ..NewDeal::default()
        })
        .collect();
    let results = client
        .create_deals(Some(deals.as_slice()), &CancellationToken::new())
        .await
        .unwrap();

    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(results[2].request_id.as_deref(), Some("req-third"));

    let fetched = client
        .get_deal(2, &[], &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.name, "second");
}

#[tokio::test]
async fn update_then_fetch_reflects_changes() {
    let (state, origin) = start_server();
    state.seed("leads", vec![json!({"name": "Deal", "price": 10})]).await;
    let client = client_with(config(&origin), Arc::new(UreqTransport::new()), TOKEN);
    let cancel = CancellationToken::new();

    let updates = [DealUpdate {
        id: 1,
        price: Some(99),
        ..DealUpdate::default()
    }];
    let results = client.update_deals(Some(&updates[..]), &cancel).await.unwrap();
    assert_eq!(results.len(), 1);

    let deal = client.get_deal(1, &[], &cancel).await.unwrap().unwrap();
    assert_eq!(deal.price, Some(99));
    assert_eq!(deal.name, "Deal");
}

#[tokio::test]
async fn missing_entity_is_none() {
    let (_state, origin) = start_server();
    let client = client_with(config(&origin), Arc::new(UreqTransport::new()), TOKEN);
    let found = client
        .get_contact(404, &[], &CancellationToken::new())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn wrong_token_is_authorization_error() {
    let (state, origin) = start_server();
    state.seed("leads", vec![json!({"name": "x"})]).await;
    let client = client_with(config(&origin), Arc::new(UreqTransport::new()), "stale");

    let err = client
        .list_deals(&ListQuery::new(), &DealFilter::default(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(err.to_string().starts_with("list_deals failed for tenant acme"));
}

#[tokio::test]
async fn rejected_chunk_stops_the_batch() {
    let (_state, origin) = start_server();
    let mut cfg = config(&origin);
    cfg.batch_size = 1;
    let client = client_with(cfg, Arc::new(UreqTransport::new()), TOKEN);

    let contacts = [
        NewContact {
            name: Some("Ann".to_string()),
            ..NewContact::default()
        },
        NewContact {
            name: Some(String::new()),
            ..NewContact::default()
        },
        NewContact {
            name: Some("Cid".to_string()),
            ..NewContact::default()
        },
    ];
    let err = client
        .create_contacts(Some(&contacts[..]), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("Request validation failed"));

    // first chunk was accepted upstream, third was never sent
    let stored = client
        .list_contacts(&ListQuery::new(), &ContactFilter::default(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}
