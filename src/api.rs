use reqwest::blocking::{Client, Response};
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::types::{Stats, Task, TaskPayload, TaskStatus};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Transport failures and application failures resolve through the same
/// error path; no call is retried and no timeout is configured.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("invalid response body: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

impl ApiError {
    /// The server-supplied message for application failures, or `None` for
    /// transport and decoding failures. The save path prefers this over the
    /// generic wording.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Thin client over the task REST API. One method per endpoint, fixed base
/// URL, no caching, no de-duplication.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn list_tasks(&self) -> ApiResult<Vec<Task>> {
        debug!("GET /tasks");
        let response = self
            .client
            .get(self.url("/tasks"))
            .header(ACCEPT, "application/json")
            .send()?;
        decode(response)
    }

    pub fn get_task(&self, id: i64) -> ApiResult<Task> {
        debug!(task_id = id, "GET /tasks/{{id}}");
        let response = self
            .client
            .get(self.url(&format!("/tasks/{id}")))
            .header(ACCEPT, "application/json")
            .send()?;
        decode(response)
    }

    pub fn create_task(&self, payload: &TaskPayload) -> ApiResult<Task> {
        debug!(title = %payload.title, "POST /tasks");
        let response = self
            .client
            .post(self.url("/tasks"))
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()?;
        decode(response)
    }

    pub fn update_task(&self, id: i64, payload: &TaskPayload) -> ApiResult<Task> {
        debug!(task_id = id, "PUT /tasks/{{id}}");
        let response = self
            .client
            .put(self.url(&format!("/tasks/{id}")))
            .header(ACCEPT, "application/json")
            .json(payload)
            .send()?;
        decode(response)
    }

    pub fn update_task_status(&self, id: i64, status: TaskStatus) -> ApiResult<()> {
        debug!(task_id = id, status = status.as_str(), "PUT /tasks/{{id}}/status");
        let response = self
            .client
            .put(self.url(&format!("/tasks/{id}/status")))
            .header(ACCEPT, "application/json")
            .json(&serde_json::json!({ "status": status }))
            .send()?;
        ensure_success(response)?;
        Ok(())
    }

    pub fn delete_task(&self, id: i64) -> ApiResult<()> {
        debug!(task_id = id, "DELETE /tasks/{{id}}");
        let response = self
            .client
            .delete(self.url(&format!("/tasks/{id}")))
            .header(ACCEPT, "application/json")
            .send()?;
        ensure_success(response)?;
        Ok(())
    }

    pub fn stats(&self) -> ApiResult<Stats> {
        debug!("GET /tasks/stats");
        let response = self
            .client
            .get(self.url("/tasks/stats"))
            .header(ACCEPT, "application/json")
            .send()?;
        decode(response)
    }
}

fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let response = ensure_success(response)?;
    let body: Value = response.json()?;
    Ok(serde_json::from_value(unwrap_envelope(body))?)
}

/// Response bodies are wrapped as `{ "data": <payload> }`; fall back to the
/// raw body when `data` is absent.
pub fn unwrap_envelope(mut body: Value) -> Value {
    match body.get_mut("data") {
        Some(data) => data.take(),
        None => body,
    }
}

fn ensure_success(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ApiError::Api {
        status: status.as_u16(),
        message: error_message(status.as_u16(), &body),
    })
}

/// Extract a `message` (or `error`) field from an error body, falling back
/// to a status-code description for bodies that carry neither.
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("request failed with status {status}"))
}
