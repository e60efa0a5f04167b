use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{LinkedEntity, ListFilter, ListQuery, QueryParams, ValueRange};
use crate::types::{CustomFieldValue, EntityRef, Tag, WriteResult};

pub const CONTACTS_PATH: &str = "contacts";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub id: u64,
    pub name: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
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
    pub embedded: Option<ContactLinks>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactLinks {
    pub tags: Vec<Tag>,
    pub companies: Vec<EntityRef>,
    pub leads: Vec<EntityRef>,
    pub customers: Vec<EntityRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewContact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields_values: Option<Vec<CustomFieldValue>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFilter {
    pub names: Vec<String>,
    pub created_by: Vec<u64>,
    pub responsible_user_ids: Vec<u64>,
    pub created_at: Option<ValueRange<i64>>,
    pub updated_at: Option<ValueRange<i64>>,
}

impl ListFilter for ContactFilter {
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
struct ContactsEmbedded<T> {
    #[serde(default = "Vec::new")]
    contacts: Vec<T>,
}

impl CrmClient {
    pub async fn list_contacts(
        &self,
        query: &ListQuery,
        filter: &ContactFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Contact>, ApiError> {
        let uri = self.list_uri(CONTACTS_PATH, query, filter)?;
        self.list_pages(
            "list_contacts",
            &uri,
            |e: ContactsEmbedded<Contact>| e.contacts,
            cancel,
        )
        .await
    }

    pub async fn get_contact(
        &self,
        id: u64,
        with: &[LinkedEntity],
        cancel: &CancellationToken,
    ) -> Result<Option<Contact>, ApiError> {
        let uri = self.entity_uri(CONTACTS_PATH, id, with)?;
        self.fetch_one("get_contact", &uri, cancel).await
    }

    pub async fn create_contacts(
        &self,
        contacts: Option<&[NewContact]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_contacts",
            HttpMethod::Post,
            CONTACTS_PATH,
            contacts,
            |e: ContactsEmbedded<WriteResult>| e.contacts,
            cancel,
        )
        .await
    }

    pub async fn update_contacts(
        &self,
        contacts: Option<&[ContactUpdate]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "update_contacts",
            HttpMethod::Patch,
            CONTACTS_PATH,
            contacts,
            |e: ContactsEmbedded<WriteResult>| e.contacts,
            cancel,
        )
        .await
    }
}
