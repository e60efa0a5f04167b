//! Customers: repeat-purchase records.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{ListFilter, ListQuery, QueryParams, ValueRange};
use crate::types::{CustomFieldValue, EntityRef, Tag, WriteResult};

pub const CUSTOMERS_PATH: &str = "customers";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: u64,
    pub name: String,
    pub next_price: Option<i64>,
    pub next_date: Option<i64>,
    pub responsible_user_id: Option<u64>,
    pub status_id: Option<u64>,
    pub periodicity: Option<u32>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub closest_task_at: Option<i64>,
    pub is_deleted: bool,
    pub ltv: Option<i64>,
    pub purchases_count: Option<u32>,
    pub average_check: Option<i64>,
    pub account_id: Option<u64>,
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    #[serde(rename = "_embedded", skip_serializing_if = "Option::is_none")]
    pub embedded: Option<CustomerLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomerLinks {
    pub tags: Vec<Tag>,
    pub contacts: Vec<EntityRef>,
    pub companies: Vec<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_date: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFilter {
    pub names: Vec<String>,
    pub next_date: Option<ValueRange<i64>>,
    pub status_ids: Vec<u64>,
    pub responsible_user_ids: Vec<u64>,
}

impl ListFilter for CustomerFilter {
    fn write(&self, params: &mut QueryParams) {
        params.filter_list("name", &self.names);
        if let Some(range) = &self.next_date {
            params.filter_range("next_date", range);
        }
        params.filter_list("status", &self.status_ids);
        params.filter_list("responsible_user_id", &self.responsible_user_ids);
    }
}

#[derive(Debug, Deserialize)]
struct CustomersEmbedded<T> {
    #[serde(default = "Vec::new")]
    customers: Vec<T>,
}

impl CrmClient {
    pub async fn list_customers(
        &self,
        query: &ListQuery,
        filter: &CustomerFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Customer>, ApiError> {
        let uri = self.list_uri(CUSTOMERS_PATH, query, filter)?;
        self.list_pages(
            "list_customers",
            &uri,
            |e: CustomersEmbedded<Customer>| e.customers,
            cancel,
        )
        .await
    }

    pub async fn create_customers(
        &self,
        customers: Option<&[NewCustomer]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_customers",
            HttpMethod::Post,
            CUSTOMERS_PATH,
            customers,
            |e: CustomersEmbedded<WriteResult>| e.customers,
            cancel,
        )
        .await
    }

    pub async fn update_customers(
        &self,
        customers: Option<&[CustomerUpdate]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "update_customers",
            HttpMethod::Patch,
            CUSTOMERS_PATH,
            customers,
            |e: CustomersEmbedded<WriteResult>| e.customers,
            cancel,
        )
        .await
    }
}
