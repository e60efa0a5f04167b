//! Customer transactions (purchases).
//!
//! Listing spans every customer at `customers/transactions`; creation is
//! scoped to one customer at `customers/{id}/transactions`.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::ListQuery;
use crate::types::WriteResult;

use super::customers::CUSTOMERS_PATH;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Transaction {
    pub id: u64,
    pub price: i64,
    pub comment: Option<String>,
    pub customer_id: Option<u64>,
    pub completed_at: Option<i64>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub is_deleted: bool,
    pub account_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionsEmbedded<T> {
    #[serde(default = "Vec::new")]
    transactions: Vec<T>,
}

fn customer_transactions_path(customer_id: u64) -> String {
    format!("{CUSTOMERS_PATH}/{customer_id}/transactions")
}

impl CrmClient {
    /// Transactions across all customers.
    pub async fn list_transactions(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<Transaction>, ApiError> {
        let uri = self.list_uri(&format!("{CUSTOMERS_PATH}/transactions"), query, &())?;
        self.list_pages(
            "list_transactions",
            &uri,
            |e: TransactionsEmbedded<Transaction>| e.transactions,
            cancel,
        )
        .await
    }

    pub async fn create_transactions(
        &self,
        customer_id: u64,
        transactions: Option<&[NewTransaction]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_transactions",
            HttpMethod::Post,
            &customer_transactions_path(customer_id),
            transactions,
            |e: TransactionsEmbedded<WriteResult>| e.transactions,
            cancel,
        )
        .await
    }
}
