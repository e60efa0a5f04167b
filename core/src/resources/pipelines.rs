//! Sales pipelines and their stages, under `leads/pipelines`.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::query::ListQuery;

use super::deals::DEALS_PATH;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub id: u64,
    pub name: String,
    pub sort: Option<i64>,
    pub is_main: bool,
    pub is_unsorted_on: bool,
    pub is_archive: bool,
    pub account_id: Option<u64>,
    #[serde(rename = "_embedded", skip_serializing_if = "Option::is_none")]
    pub embedded: Option<PipelineStages>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineStages {
    pub statuses: Vec<Stage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    pub id: u64,
    pub name: String,
    pub sort: Option<i64>,
    pub is_editable: bool,
    pub pipeline_id: Option<u64>,
    pub color: Option<String>,
    /// 0 for regular stages, 1 for the unsorted stage.
    #[serde(rename = "type")]
    pub stage_type: Option<u8>,
}

impl Pipeline {
    pub fn stages(&self) -> &[Stage] {
        self.embedded
            .as_ref()
            .map(|e| e.statuses.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct PipelinesEmbedded {
    #[serde(default)]
    pipelines: Vec<Pipeline>,
}

fn pipelines_path() -> String {
    format!("{DEALS_PATH}/pipelines")
}

impl CrmClient {
    pub async fn list_pipelines(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<Pipeline>, ApiError> {
        let uri = self.list_uri(&pipelines_path(), &ListQuery::new(), &())?;
        self.list_pages("list_pipelines", &uri, |e: PipelinesEmbedded| e.pipelines, cancel)
            .await
    }

    pub async fn get_pipeline(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Pipeline>, ApiError> {
        let uri = self.entity_uri(&pipelines_path(), id, &[])?;
        self.fetch_one("get_pipeline", &uri, cancel).await
    }
}
