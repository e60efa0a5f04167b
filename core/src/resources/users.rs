//! Account users. Read-only.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::query::{LinkedEntity, ListQuery};

pub const USERS_PATH: &str = "users";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: Option<String>,
    pub lang: Option<String>,
    pub rights: Option<UserRights>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRights {
    pub is_admin: bool,
    pub is_free: bool,
    pub is_active: bool,
    pub group_id: Option<u64>,
    pub role_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct UsersEmbedded {
    #[serde(default)]
    users: Vec<User>,
}

impl CrmClient {
    pub async fn list_users(
        &self,
        query: &ListQuery,
        cancel: &CancellationToken,
    ) -> Result<Vec<User>, ApiError> {
        let uri = self.list_uri(USERS_PATH, query, &())?;
        self.list_pages("list_users", &uri, |e: UsersEmbedded| e.users, cancel)
            .await
    }

    pub async fn get_user(
        &self,
        id: u64,
        with: &[LinkedEntity],
        cancel: &CancellationToken,
    ) -> Result<Option<User>, ApiError> {
        let uri = self.entity_uri(USERS_PATH, id, with)?;
        self.fetch_one("get_user", &uri, cancel).await
    }
}
