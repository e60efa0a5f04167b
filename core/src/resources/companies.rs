use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{LinkedEntity, ListFilter, ListQuery, QueryParams, ValueRange};
use crate::types::{CustomFieldValue, EntityRef, Tag, WriteResult};

pub const COMPANIES_PATH: &str = "companies";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Company {
    pub id: u64,
    pub name: String,
    pub responsible_user_id: Option<u64>,
    pub group_id: Option<u64>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub closest_task_at: Option<i64>,
    pub is_deleted: bool,
    pub account_id: Option<u64>,
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    #[serde(rename = "_embedded", skip_serializing_if = "Option::is_none")]
    pub embedded: Option<CompanyLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyLinks {
    pub tags: Vec<Tag>,
    pub contacts: Vec<EntityRef>,
    pub leads: Vec<EntityRef>,
    pub customers: Vec<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCompany {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompanyFilter {
    pub names: Vec<String>,
    pub created_by: Vec<u64>,
    pub responsible_user_ids: Vec<u64>,
    pub created_at: Option<ValueRange<i64>>,
    pub updated_at: Option<ValueRange<i64>>,
}

impl ListFilter for CompanyFilter {
    fn write(&self, params: &mut QueryParams) {
        params.filter_list("name", &self.names);
        params.filter_list("created_by", &self.created_by);
        params.filter_list("responsible_user_id", &self.responsible_user_ids);
        if let Some(range) = &self.created_at {
            params.filter_range("created_at", range);
        }
        if let Some(range) = &self.updated_at {
            params.filter_range("updated_at", range);
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompaniesEmbedded<T> {
    #[serde(default = "Vec::new")]
    companies: Vec<T>,
}

impl CrmClient {
    pub async fn list_companies(
        &self,
        query: &ListQuery,
        filter: &CompanyFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Company>, ApiError> {
        let uri = self.list_uri(COMPANIES_PATH, query, filter)?;
        self.list_pages(
            "list_companies",
            &uri,
            |e: CompaniesEmbedded<Company>| e.companies,
            cancel,
        )
        .await
    }

    pub async fn get_company(
        &self,
        id: u64,
        with: &[LinkedEntity],
        cancel: &CancellationToken,
    ) -> Result<Option<Company>, ApiError> {
        let uri = self.entity_uri(COMPANIES_PATH, id, with)?;
        self.fetch_one("get_company", &uri, cancel).await
    }

    pub async fn create_companies(
        &self,
        companies: Option<&[NewCompany]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_companies",
            HttpMethod::Post,
            COMPANIES_PATH,
            companies,
            |e: CompaniesEmbedded<WriteResult>| e.companies,
            cancel,
        )
        .await
    }

    pub async fn update_companies(
        &self,
        companies: Option<&[CompanyUpdate]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "update_companies",
            HttpMethod::Patch,
            COMPANIES_PATH,
            companies,
            |e: CompaniesEmbedded<WriteResult>| e.companies,
            cancel,
        )
        .await
    }
}
