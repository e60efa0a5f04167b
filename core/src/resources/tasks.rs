//! Tasks: dated to-dos, optionally attached to a deal, contact, company or
//! customer.
//!
//! # Design
//! `complete_till` is a unix timestamp and is required on create. Completion
//! is filtered as `0`/`1`, the form the API expects.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::client::CrmClient;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::{ListFilter, ListQuery, QueryParams, ValueRange};
use crate::types::{EntityType, WriteResult};

pub const TASKS_PATH: &str = "tasks";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: u64,
    pub text: String,
    pub task_type_id: Option<u64>,
    pub entity_id: Option<u64>,
    pub entity_type: Option<EntityType>,
    pub responsible_user_id: Option<u64>,
    pub group_id: Option<u64>,
    pub created_by: Option<u64>,
    pub updated_by: Option<u64>,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    pub complete_till: Option<i64>,
    pub duration: Option<i64>,
    pub is_completed: bool,
    pub result: Option<TaskResult>,
    pub account_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub text: String,
    /// Unix seconds.
    pub complete_till: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complete_till: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_user_id: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub responsible_user_ids: Vec<u64>,
    pub is_completed: Option<bool>,
    pub task_types: Vec<u64>,
    pub entity_type: Option<EntityType>,
    pub entity_ids: Vec<u64>,
    pub updated_at: Option<ValueRange<i64>>,
}

impl ListFilter for TaskFilter {
    fn write(&self, params: &mut QueryParams) {
        params.filter_list("responsible_user_id", &self.responsible_user_ids);
        if let Some(done) = self.is_completed {
            params.filter("is_completed", u8::from(done));
        }
        params.filter_list("task_type", &self.task_types);
        if let Some(entity_type) = self.entity_type {
            params.filter("entity_type", entity_type);
        }
        params.filter_list("entity_id", &self.entity_ids);
        if let Some(range) = &self.updated_at {
            params.filter_range("updated_at", range);
        }
    }
}

#[derive(Debug, Deserialize)]
struct TasksEmbedded<T> {
    #[serde(default = "Vec::new")]
    tasks: Vec<T>,
}

impl CrmClient {
    pub async fn list_tasks(
        &self,
        query: &ListQuery,
        filter: &TaskFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Task>, ApiError> {
        let uri = self.list_uri(TASKS_PATH, query, filter)?;
        self.list_pages("list_tasks", &uri, |e: TasksEmbedded<Task>| e.tasks, cancel)
            .await
    }

    pub async fn get_task(
        &self,
        id: u64,
        cancel: &CancellationToken,
    ) -> Result<Option<Task>, ApiError> {
        let uri = self.entity_uri(TASKS_PATH, id, &[])?;
        self.fetch_one("get_task", &uri, cancel).await
    }

    pub async fn create_tasks(
        &self,
        tasks: Option<&[NewTask]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "create_tasks",
            HttpMethod::Post,
            TASKS_PATH,
            tasks,
            |e: TasksEmbedded<WriteResult>| e.tasks,
            cancel,
        )
        .await
    }

    pub async fn update_tasks(
        &self,
        tasks: Option<&[TaskUpdate]>,
        cancel: &CancellationToken,
    ) -> Result<Vec<WriteResult>, ApiError> {
        self.write_batch(
            "update_tasks",
            HttpMethod::Patch,
            TASKS_PATH,
            tasks,
            |e: TasksEmbedded<WriteResult>| e.tasks,
            cancel,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_flag_renders_as_digit() {
        let mut params = QueryParams::new();
        TaskFilter {
            is_completed: Some(false),
            entity_type: Some(EntityType::Deals),
            entity_ids: vec![10],
            ..TaskFilter::default()
        }
        .write(&mut params);

        let pairs: Vec<(&str, &str)> = params.iter().collect();
        assert_eq!(
            pairs,
            [
                ("filter[is_completed]", "0"),
                ("filter[entity_type]", "leads"),
                ("filter[entity_id][0]", "10"),
            ]
        );
    }

    #[test]
    fn task_decodes_entity_type() {
        let task: Task = serde_json::from_str(
            r#"{"id": 1, "text": "call back", "entity_type": "leads", "entity_id": 3,
                "is_completed": true, "result": {"text": "done"}}"#,
        )
        .unwrap();
        assert_eq!(task.entity_type, Some(EntityType::Deals));
        assert_eq!(task.result.unwrap().text, "done");
    }
}
