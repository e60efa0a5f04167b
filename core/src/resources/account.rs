//! The account the token belongs to.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::query::{join_linked, LinkedEntity};

pub const ACCOUNT_PATH: &str = "account";

/// The authenticated account. Fields under `_embedded` are present only
/// when requested through `with`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: u64,
    pub name: String,
    pub subdomain: String,
    pub country: Option<String>,
    pub currency: Option<String>,
    pub currency_symbol: Option<String>,
    pub current_user_id: Option<u64>,
    pub created_at: Option<i64>,
    pub created_by: Option<u64>,
    pub is_technical_account: bool,
    pub amojo_id: Option<String>,
    pub version: Option<u64>,
    #[serde(rename = "_embedded", skip_serializing_if = "Option::is_none")]
    pub embedded: Option<serde_json::Value>,
}

impl CrmClient {
    pub async fn get_account(
        &self,
        with: &[LinkedEntity],
        cancel: &CancellationToken,
    ) -> Result<Option<Account>, ApiError> {
        let mut uri = self.resource_uri(ACCOUNT_PATH)?;
        if !with.is_empty() {
            uri.params_mut().push("with", join_linked(with));
        }
        self.fetch_one("get_account", &uri, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_keeps_embedded_as_raw_json() {
        let account: Account = serde_json::from_str(
            r#"{"id": 1, "name": "Acme", "subdomain": "acme", "currency": "USD",
                "_embedded": {"task_types": [{"id": 1, "name": "Call"}]}}"#,
        )
        .unwrap();
        assert_eq!(account.subdomain, "acme");
        let embedded = account.embedded.unwrap();
        assert_eq!(embedded["task_types"][0]["name"], "Call");
    }
}
