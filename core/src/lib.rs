//! Typed client core for a CRM REST API (amoCRM / Kommo v4 dialect).
//!
//! # Overview
//! Builds requests, classifies responses and orchestrates multi-request
//! operations without owning any network code. The caller plugs in a
//! `Transport` that performs the actual HTTP round-trip, so every engine in
//! this crate is deterministic and testable against canned responses.
//!
//! # Design
//! - `query` renders list requests to deterministic URIs.
//! - `classify` maps one response to `Ok`, `Empty` or `Failed`.
//! - `paginate::traverse` follows next-page links until none remain.
//! - `batch::batch_write` splits writes into bounded chunks, sent in order.
//! - `CrmClient` ties them to a tenant, a transport and a token source;
//!   `resources` adds one module per API resource on top of it.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod auth;
pub mod batch;
pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod paginate;
pub mod query;
pub mod resources;
pub mod transport;
pub mod types;

pub use auth::{StaticToken, TokenSource};
pub use classify::{classify, Classified};
pub use client::CrmClient;
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, ErrorKind};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use query::{LinkedEntity, ListFilter, ListQuery, QueryParams, ResourceUri, ValueRange};
pub use transport::{CachingTransport, Transport};
pub use types::{EntityType, Page, WriteResult};
