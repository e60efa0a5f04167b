//! Shared wire types: the page envelope and records reused across resources.
//!
//! # Design
//! Every list and write endpoint wraps its records as
//! `{"_page": n, "_links": {...}, "_embedded": {"<key>": [...]}}`, with a
//! different `<key>` per resource. `Page<E>` captures the envelope and each
//! resource supplies its own `E`; the engines only ever see the page through
//! caller-supplied selectors.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

/// Page envelope returned by list and batch-write endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<E> {
    #[serde(rename = "_page", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(rename = "_links", default)]
    pub links: PageLinks,
    #[serde(rename = "_embedded")]
    pub embedded: E,
}

impl<E> Page<E> {
    /// Absolute link to the following page, if the API sent one.
    pub fn next_link(&self) -> Option<Url> {
        self.links.next.as_ref().map(|next| next.href.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLinks {
    #[serde(rename = "self", default, skip_serializing_if = "Option::is_none")]
    pub current: Option<Href>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Href>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev: Option<Href>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Href {
    pub href: Url,
}

/// Entity kinds that own notes, links and custom fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    #[serde(rename = "leads")]
    Deals,
    Contacts,
    Companies,
    Customers,
}

impl EntityType {
    /// Path segment and wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Deals => "leads",
            EntityType::Contacts => "contacts",
            EntityType::Companies => "companies",
            EntityType::Customers => "customers",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item returned for each entity of a create or update batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResult {
    pub id: u64,
    /// Echo of the `request_id` sent with the payload, when one was sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}

/// One custom field's values on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub field_id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    pub values: Vec<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub value: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Reference to another entity inside an `_embedded` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_main: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Items {
        items: Vec<u32>,
    }

    #[test]
    fn envelope_exposes_next_link() {
        let page: Page<Items> = serde_json::from_str(
            r#"{
                "_page": 1,
                "_links": {
                    "self": {"href": "https://acme.kommo.com/api/v4/leads?page=1"},
                    "next": {"href": "https://acme.kommo.com/api/v4/leads?page=2"}
                },
                "_embedded": {"items": [1, 2]}
            }"#,
        )
        .unwrap();
        assert_eq!(
            page.next_link().unwrap().as_str(),
            "https://acme.kommo.com/api/v4/leads?page=2"
        );
        assert_eq!(page.embedded.items, vec![1, 2]);
    }

    #[test]
    fn envelope_without_links_has_no_next() {
        let page: Page<Items> = serde_json::from_str(r#"{"_embedded": {"items": []}}"#).unwrap();
        assert!(page.next_link().is_none());
        assert_eq!(page.page, None);
    }

    #[test]
    fn relative_next_link_is_rejected() {
        let result = serde_json::from_str::<Page<Items>>(
            r#"{"_links": {"next": {"href": "/leads?page=2"}}, "_embedded": {"items": []}}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn entity_type_uses_wire_names() {
        assert_eq!(serde_json::to_string(&EntityType::Deals).unwrap(), "\"leads\"");
        assert_eq!(
            serde_json::from_str::<EntityType>("\"companies\"").unwrap(),
            EntityType::Companies
        );
        assert_eq!(EntityType::Customers.to_string(), "customers");
    }
}
