use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::task::{Task, User};
use crate::view::ViewState;

/// Errors from the task API, split the way the command layer needs them:
/// authorization failures force a logout, everything else is reported and
/// retried by the user. No automatic retries, no client-side timeout.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("failed to decode server response: {0}")]
    Decode(#[from] std::io::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.auth_request("/api/login", email, password)
    }

    #[instrument(skip(self, password))]
    pub fn register(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.auth_request("/api/register", email, password)
    }

    fn auth_request(
        &self,
        path: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthResponse, ApiError> {
        let result = ureq::post(&self.endpoint(path))
            .send_json(serde_json::json!({ "email": email, "password": password }));
        decode(result)
    }

    #[instrument(skip(self, token, view))]
    pub fn list_tasks(&self, token: &str, view: &ViewState) -> Result<TaskPage, ApiError> {
        let pairs = view.query_pairs();
        debug!(?pairs, "fetching tasks");

        let mut request =
            ureq::get(&self.endpoint("/api/tasks")).set("Authorization", &bearer(token));
        for (key, value) in &pairs {
            request = request.query(key, value);
        }

        decode(request.call())
    }

    #[instrument(skip(self, token, task))]
    pub fn create_task(&self, token: &str, task: &Task) -> Result<(), ApiError> {
        discard(
            ureq::post(&self.endpoint("/api/tasks"))
                .set("Authorization", &bearer(token))
                .send_json(task),
        )
    }

    #[instrument(skip(self, token, task))]
    pub fn update_task(&self, token: &str, id: &str, task: &Task) -> Result<(), ApiError> {
        discard(
            ureq::put(&format!("{}/{id}", self.endpoint("/api/tasks")))
                .set("Authorization", &bearer(token))
                .send_json(task),
        )
    }

    #[instrument(skip(self, token))]
    pub fn delete_task(&self, token: &str, id: &str) -> Result<(), ApiError> {
        discard(
            ureq::delete(&format!("{}/{id}", self.endpoint("/api/tasks")))
                .set("Authorization", &bearer(token))
                .call(),
        )
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

fn decode<T: DeserializeOwned>(result: Result<ureq::Response, ureq::Error>) -> Result<T, ApiError> {
    let response = check(result)?;
    response.into_json::<T>().map_err(ApiError::Decode)
}

fn discard(result: Result<ureq::Response, ureq::Error>) -> Result<(), ApiError> {
    check(result).map(|_| ())
}

fn check(result: Result<ureq::Response, ureq::Error>) -> Result<ureq::Response, ApiError> {
    match result {
        Ok(response) => Ok(response),
        Err(ureq::Error::Status(status, response)) => Err(status_error(status, response)),
        Err(err) => Err(ApiError::Transport(err.to_string())),
    }
}

fn status_error(status: u16, response: ureq::Response) -> ApiError {
    if status == 401 || status == 403 {
        return ApiError::Unauthorized;
    }

    // Prefer the server's own message; the body shape is {"error": "..."}.
    let message = response
        .into_json::<ErrorBody>()
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| format!("request failed with status {status}"));

    ApiError::Api { status, message }
}
