//! Account-defined custom field definitions, per entity type.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::ListQuery;
use crate::types::{EntityType, WriteResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomField {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub code: Option<String>,
    pub sort: Option<i64>,
    pub entity_type: Option<EntityType>,
    pub is_api_only: bool,
    pub is_required: bool,
    pub group_id: Option<String>,
    pub enums: Option<Vec<FieldEnum>>,
}

/// One selectable option of a list-typed field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEnum {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCustomField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_api_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enums: Option<Vec<FieldEnum>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CustomFieldsEmbedded<T> {
    #[serde(default = "Vec::new")]
    custom_fields: Vec<T>,
}

fn custom_fields_path(entity: EntityType) -> String {
    format!("{entity}/custom_fields")
}

impl CrmClient {
    pub async fn list_custom_fields(
        &self,
        entity: EntityType,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<CustomField>, ApiError> {
        let uri = self.list_uri(&custom_fields_path(entity), query, &())?;
        self.list_pages(
            "list_custom_fields",
            &uri,
            |e: CustomFieldsEmbedded<CustomField>| e.custom_fields,
            cancel,
        )
        .await
    }

    pub async fn create_custom_fields(
        &self,
        entity: EntityType,
        fields: Option<&[NewCustomField]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_custom_fields",
            HttpMethod::Post,
            &custom_fields_path(entity),
            fields,
            |e: CustomFieldsEmbedded<WriteResult>| e.custom_fields,
            cancel,
        )
        .await
    }
}
