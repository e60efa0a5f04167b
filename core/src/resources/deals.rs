//! Deals, exposed by the API as `leads`.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{LinkedEntity, ListFilter, ListQuery, QueryParams, ValueRange};
use crate::types::{CustomFieldValue, EntityRef, Tag, WriteResult};

pub const DEALS_PATH: &str = "leads";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Deal {
    pub id: u64,
    pub name: String,
    pub price: Option<i64>,
    pub responsible_user_id: Option<u64>,
    pub group_id: Option<u64>,
    pub status_id: Option<u64>,
    pub pipeline_id: Option<u64>,
    pub loss_reason_id: Option<u64>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub closed_at: Option<i64>,
    pub closest_task_at: Option<i64>,
    pub is_deleted: bool,
    pub score: Option<i64>,
    pub account_id: Option<u64>,
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    #[serde(rename = "_embedded", skip_serializing_if = "Option::is_none")]
    pub embedded: Option<DealLinks>,
}

/// Data embedded in a deal when requested through `with`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DealLinks {
    pub tags: Vec<Tag>,
    pub contacts: Vec<EntityRef>,
    pub companies: Vec<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewDeal {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    /// Echoed back in the write result so callers can match results to input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Partial update; only set fields are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
}

/// A pipeline stage to filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageRef {
    pub pipeline_id: u64,
    pub status_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DealFilter {
    pub names: Vec<String>,
    pub price: Option<ValueRange<i64>>,
    pub statuses: Vec<StageRef>,
    pub pipeline_ids: Vec<u64>,
    pub created_by: Vec<u64>,
    pub updated_by: Vec<u64>,
    pub responsible_user_ids: Vec<u64>,
    pub created_at: Option<ValueRange<i64>>,
    pub updated_at: Option<ValueRange<i64>>,
    pub closed_at: Option<ValueRange<i64>>,
}

impl ListFilter for DealFilter {
    fn write(&self, params: &mut QueryParams) {
        params.filter_list("name", &self.names);
        if let Some(price) = &self.price {
            params.filter_range("price", price);
        }
        for (index, stage) in self.statuses.iter().enumerate() {
            params.push(format!("filter[statuses][{index}][pipeline_id]"), stage.pipeline_id);
            params.push(format!("filter[statuses][{index}][status_id]"), stage.status_id);
        }
        params.filter_list("pipeline_id", &self.pipeline_ids);
        params.filter_list("created_by", &self.created_by);
        params.filter_list("updated_by", &self.updated_by);
        params.filter_list("responsible_user_id", &self.responsible_user_ids);
        if let Some(range) = &self.created_at {
            params.filter_range("created_at", range);
        }
        if let Some(range) = &self.updated_at {
            params.filter_range("updated_at", range);
        }
        if let Some(range) = &self.closed_at {
            params.filter_range("closed_at", range);
        }
    }
}

#[derive(Debug, Deserialize)]
struct DealsEmbedded<T> {
    #[serde(default = "Vec::new")]
    leads: Vec<T>,
}

impl CrmClient {
    pub async fn list_deals(
        &self,
        query: &ListQuery,
        filter: &DealFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Deal>, ApiError> {
        let uri = self.list_uri(DEALS_PATH, query, filter)?;
        self.list_pages("list_deals", &uri, |e: DealsEmbedded<Deal>| e.leads, cancel)
            .await
    }

    pub async fn get_deal(
        &self,
        id: u64,
        with: &[LinkedEntity],
        cancel: &CancellationToken,
    ) -> Result<Option<Deal>, ApiError> {
        let uri = self.entity_uri(DEALS_PATH, id, with)?;
        self.fetch_one("get_deal", &uri, cancel).await
    }

    pub async fn create_deals(
        &self,
        deals: Option<&[NewDeal]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_deals",
            HttpMethod::Post,
            DEALS_PATH,
            deals,
            |e: DealsEmbedded<WriteResult>| e.leads,
            cancel,
        )
        .await
    }

    pub async fn update_deals(
        &self,
        deals: Option<&[DealUpdate]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "update_deals",
            HttpMethod::Patch,
            DEALS_PATH,
            deals,
            |e: DealsEmbedded<WriteResult>| e.leads,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(filter: &DealFilter) -> Vec<(String, String)> {
        let mut params = QueryParams::new();
        filter.write(&mut params);
        params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn filter_fields_render_in_declared_order() {
        let filter = DealFilter {
            closed_at: Some(ValueRange::since(100)),
            responsible_user_ids: vec![7],
            statuses: vec![StageRef {
                pipeline_id: 1,
                status_id: 142,
            }],
            price: Some(ValueRange::between(10, 20)),
            names: vec!["Big".to_string()],
            ..DealFilter::default()
        };
        let keys: Vec<String> = rendered(&filter).into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "filter[name][0]",
                "filter[price][from]",
                "filter[price][to]",
                "filter[statuses][0][pipeline_id]",
                "filter[statuses][0][status_id]",
                "filter[responsible_user_id][0]",
                "filter[closed_at][from]",
            ]
        );
    }

    #[test]
    fn empty_filter_writes_nothing() {
        assert!(rendered(&DealFilter::default()).is_empty());
    }

    #[test]
    fn update_payload_skips_unset_fields() {
        let update = DealUpdate {
            id: 5,
            price: Some(900),
            ..DealUpdate::default()
        };
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"id":5,"price":900}"#);
    }

    #[test]
    fn deal_decodes_with_embedded_links() {
        let deal: Deal = serde_json::from_str(
            r#"{
                "id": 3, "name": "Big", "price": 1000, "status_id": 142,
                "custom_fields_values": null,
                "_embedded": {"tags": [{"id": 1, "name": "vip"}], "contacts": [{"id": 9, "is_main": true}]}
            }"#,
        )
        .unwrap();
        assert_eq!(deal.id, 3);
        assert_eq!(deal.price, Some(1000));
        let links = deal.embedded.unwrap();
        assert_eq!(links.tags[0].name, "vip");
        assert_eq!(links.contacts[0].id, 9);
        assert!(links.companies.is_empty());
    }
}
