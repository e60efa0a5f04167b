//! Installed widgets, addressed by their code.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::query::ListQuery;

pub const WIDGETS_PATH: &str = "widgets";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Widget {
    pub id: u64,
    pub code: String,
    pub version: Option<String>,
    pub rating: Option<String>,
    pub is_lead_source: bool,
    pub is_work_with_dp: bool,
    pub is_crm_template: bool,
    pub client_uuid: Option<String>,
    pub is_active_in_account: bool,
    pub pipeline_id: Option<u64>,
    /// Installation settings; shape is widget-specific.
    pub settings: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct WidgetsEmbedded {
    #[serde(default)]
    widgets: Vec<Widget>,
}

impl CrmClient {
    pub async fn list_widgets(&self, cancel: &CancellationToken) -> Result<Vec<Widget>, ApiError> {
        let uri = self.list_uri(WIDGETS_PATH, &ListQuery::new(), &())?;
        self.list_pages("list_widgets", &uri, |e: WidgetsEmbedded| e.widgets, cancel)
            .await
    }

    /// Look a widget up by its code. Blank codes and codes containing `/`
    /// are rejected before any request.
    pub async fn get_widget(
        &self,
        code: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Widget>, ApiError> {
        let code = code.trim();
        if code.is_empty() || code.contains('/') {
            return Err(ApiError::PreconditionViolation(format!(
                "invalid widget code '{code}'"
            )));
        }
        let uri = self.entity_uri(WIDGETS_PATH, code, &[])?;
        self.fetch_one("get_widget", &uri, cancel).await
    }
}
