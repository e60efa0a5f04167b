//! Client configuration.
//!
//! `ClientConfig` deserializes from any serde source (an application's own
//! config file) or is read from `CRM_*` environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Largest page the list endpoints accept.
pub const MAX_PAGE_SIZE: u32 = 250;
/// Largest number of entities one write request may carry.
pub const MAX_BATCH_SIZE: usize = 50;

pub const DEFAULT_BASE_DOMAIN: &str = "kommo.com";
pub const DEFAULT_API_PREFIX: &str = "api/v4";

const ENV_SUBDOMAIN: &str = "CRM_SUBDOMAIN";
const ENV_BASE_DOMAIN: &str = "CRM_BASE_DOMAIN";
const ENV_PAGE_SIZE: &str = "CRM_PAGE_SIZE";
const ENV_BATCH_SIZE: &str = "CRM_BATCH_SIZE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Account subdomain, the tenant identifier.
    pub subdomain: String,
    #[serde(default = "default_base_domain")]
    pub base_domain: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Use `http` instead of `https`. Only meant for local mock servers.
    #[serde(default)]
    pub insecure_http: bool,
    /// Explicit origin (`scheme://host[:port]`) replacing
    /// `https://{subdomain}.{base_domain}`.
    #[serde(default)]
    pub origin_override: Option<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_base_domain() -> String {
    DEFAULT_BASE_DOMAIN.to_string()
}
fn default_api_prefix() -> String {
    DEFAULT_API_PREFIX.to_string()
}
fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}
fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            subdomain: String::new(),
            base_domain: default_base_domain(),
            api_prefix: default_api_prefix(),
            insecure_http: false,
            origin_override: None,
            page_size: default_page_size(),
            batch_size: default_batch_size(),
        }
    }
}

impl ClientConfig {
    pub fn new(subdomain: impl Into<String>) -> Self {
        Self {
            subdomain: subdomain.into(),
            ..Self::default()
        }
    }

    /// Point the client at an explicit origin, e.g. a local mock server.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin_override = Some(origin.into());
        self
    }

    /// Read `CRM_SUBDOMAIN` (required), `CRM_BASE_DOMAIN`, `CRM_PAGE_SIZE`
    /// and `CRM_BATCH_SIZE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let subdomain = lookup(ENV_SUBDOMAIN).ok_or(ConfigError::Missing(ENV_SUBDOMAIN))?;
        let mut config = Self::new(subdomain);
        if let Some(domain) = lookup(ENV_BASE_DOMAIN) {
            config.base_domain = domain;
        }
        if let Some(raw) = lookup(ENV_PAGE_SIZE) {
            config.page_size = raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: ENV_PAGE_SIZE,
                reason: e.to_string(),
            })?;
        }
        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            config.batch_size = raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
                name: ENV_BATCH_SIZE,
                reason: e.to_string(),
            })?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.subdomain.trim().is_empty() {
            return Err(ConfigError::Missing("subdomain"));
        }
        if self.subdomain.contains(['/', '.', ':']) {
            return Err(ConfigError::Invalid {
                name: "subdomain",
                reason: format!("'{}' is not a bare host label", self.subdomain),
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(ConfigError::Invalid {
                name: "page_size",
                reason: format!("{} (must be 1-{MAX_PAGE_SIZE})", self.page_size),
            });
        }
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ConfigError::Invalid {
                name: "batch_size",
                reason: format!("{} (must be 1-{MAX_BATCH_SIZE})", self.batch_size),
            });
        }
        self.api_root()?;
        Ok(())
    }

    /// `{origin}/{api_prefix}/`, with the trailing slash so `Url::join`
    /// appends resource paths instead of replacing the last segment.
    pub fn api_root(&self) -> Result<Url, ConfigError> {
        let origin = match &self.origin_override {
            Some(origin) => origin.trim_end_matches('/').to_string(),
            None => {
                let scheme = if self.insecure_http { "http" } else { "https" };
                format!("{scheme}://{}.{}", self.subdomain, self.base_domain)
            }
        };
        let prefix = self.api_prefix.trim_matches('/');
        let raw = if prefix.is_empty() {
            format!("{origin}/")
        } else {
            format!("{origin}/{prefix}/")
        };
        Url::parse(&raw).map_err(|e| ConfigError::Invalid {
            name: "origin",
            reason: format!("{raw}: {e}"),
        })
    }
}
