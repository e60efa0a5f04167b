//! Links between entities (deal to contact, contact to company, ...).
//!
//! Linking and unlinking are single requests rather than chunked batches:
//! the endpoints accept the whole set at once. Unlink answers 204.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::query::{ListFilter, ListQuery, QueryParams};
use crate::types::{EntityType, Page};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityLink {
    /// Source entity id; set on every link the API returns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<String>,
    pub to_entity_id: u64,
    /// Wire name of the target kind, e.g. `contacts` or `catalog_elements`.
    pub to_entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl EntityLink {
    pub fn new(entity_id: u64, to: EntityType, to_entity_id: u64) -> Self {
        Self {
            entity_id: Some(entity_id),
            entity_type: None,
            to_entity_id,
            to_entity_type: to.as_str().to_string(),
            metadata: None,
        }
    }

    #[must_use]
    pub fn main(mut self) -> Self {
        self.metadata = Some(serde_json::json!({ "is_main": true }));
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkFilter {
    pub entity_ids: Vec<u64>,
    pub to_entity_id: Option<u64>,
    pub to_entity_type: Option<String>,
}

impl ListFilter for LinkFilter {
    fn write(&self, params: &mut QueryParams) {
        params.filter_list("entity_id", &self.entity_ids);
        if let Some(id) = self.to_entity_id {
            params.filter("to_entity_id", id);
        }
        if let Some(kind) = &self.to_entity_type {
            params.filter("to_entity_type", kind);
        }
    }
}

#[derive(Debug, Deserialize)]
struct LinksEmbedded {
    #[serde(default)]
    links: Vec<EntityLink>,
}

impl CrmClient {
    pub async fn list_links(
        &self,
        entity: EntityType,
        filter: &LinkFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<EntityLink>, ApiError> {
        let uri = self.list_uri(&format!("{entity}/links"), &ListQuery::new(), filter)?;
        self.list_pages("list_links", &uri, |e: LinksEmbedded| e.links, cancel)
            .await
    }

    /// Create `links`, returning the links as stored. An empty slice sends
    /// nothing.
    pub async fn link_entities(
        &self,
        entity: EntityType,
        links: &[EntityLink],
        cancel: &CancellationToken,
    ) -> Result<Vec<EntityLink>, ApiError> {
        if links.is_empty() {
            return Ok(Vec::new());
        }
        let page: Option<Page<LinksEmbedded>> = self
            .post_one("link_entities", &format!("{entity}/link"), links, cancel)
            .await?;
        Ok(page.map(|p| p.embedded.links).unwrap_or_default())
    }

    pub async fn unlink_entities(
        &self,
        entity: EntityType,
        links: &[EntityLink],
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        if links.is_empty() {
            return Ok(());
        }
        self.post_one::<_, serde_json::Value>(
            "unlink_entities",
            &format!("{entity}/unlink"),
            links,
            cancel,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_link_serializes_metadata() {
        let link = EntityLink::new(3, EntityType::Contacts, 9).main();
        assert_eq!(
            serde_json::to_string(&link).unwrap(),
            r#"{"entity_id":3,"to_entity_id":9,"to_entity_type":"contacts","metadata":{"is_main":true}}"#
        );
    }

    #[test]
    fn filter_writes_target_after_sources() {
        let mut params = QueryParams::new();
        LinkFilter {
            to_entity_type: Some("companies".to_string()),
            to_entity_id: Some(4),
            entity_ids: vec![1, 2],
        }
        .write(&mut params);
        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(
            pairs,
            [
                ("filter[entity_id][0]", "1"),
                ("filter[entity_id][1]", "2"),
                ("filter[to_entity_id]", "4"),
                ("filter[to_entity_type]", "companies"),
            ]
        );
    }
}
