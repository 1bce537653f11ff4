use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use taskdeck_core::{
    ApiError, FieldError, PagedResponse, Task, TaskCreateRequest, TaskGateway, TaskQueryParams,
    TaskUpdateRequest,
};
use url::Url;

// ─── Error ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("HTTP client setup failed: {0}")]
    Build(#[from] reqwest::Error),
}

// ─── HttpTaskGateway ────────────────────────────────────────────────────────

/// [`TaskGateway`] over the REST API rooted at `base_url` (e.g.
/// `http://localhost:8080/api`).
///
/// Every failure comes back as an [`ApiError`]: the server's error body when
/// it sent one, a synthesized error carrying the HTTP status when it did not,
/// and the status-0 network error when no response arrived at all.
#[derive(Debug, Clone)]
pub struct HttpTaskGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTaskGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%method, %url, "request");
        self.client.request(method, url)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = dispatch(request).await?;
        let status = response.status();
        response.json::<T>().await.map_err(|e| {
            tracing::warn!(status = status.as_u16(), error = %e, "unreadable response body");
            ApiError::new(status.as_u16(), format!("Unexpected response from server: {e}"))
        })
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ApiError> {
        dispatch(request).await.map(|_| ())
    }
}

#[async_trait]
impl TaskGateway for HttpTaskGateway {
    async fn list(&self, params: &TaskQueryParams) -> Result<PagedResponse<Task>, ApiError> {
        self.send_json(self.request(Method::GET, "/tasks").query(params))
            .await
    }

    async fn get_by_id(&self, id: i64) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::GET, &format!("/tasks/{id}")))
            .await
    }

    async fn create(&self, request: &TaskCreateRequest) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::POST, "/tasks").json(request))
            .await
    }

    async fn update(&self, id: i64, request: &TaskUpdateRequest) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::PUT, &format!("/tasks/{id}")).json(request))
            .await
    }

    async fn toggle(&self, id: i64) -> Result<Task, ApiError> {
        self.send_json(self.request(Method::PATCH, &format!("/tasks/{id}/toggle")))
            .await
    }

    async fn delete(&self, id: i64) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::DELETE, &format!("/tasks/{id}")))
            .await
    }
}

// ─── Failure normalization ──────────────────────────────────────────────────

/// Error body as the backend sends it; every field is optional so partial
/// bodies still carry what they have.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    status: Option<u16>,
    message: Option<String>,
    timestamp: Option<String>,
    errors: Option<Vec<FieldError>>,
}

async fn dispatch(request: RequestBuilder) -> Result<reqwest::Response, ApiError> {
    let response = request.send().await.map_err(|e| {
        tracing::warn!(error = %e, "no response from server");
        ApiError::network()
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.map_err(|e| {
        tracing::warn!(status = status.as_u16(), error = %e, "error body was cut off");
        ApiError::network()
    })?;
    let err = error_from_body(status, &body);
    tracing::debug!(status = err.status, message = %err.message, "request failed");
    Err(err)
}

fn error_from_body(status: StatusCode, body: &str) -> ApiError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if parsed.message.is_some() => {
            let fallback = ApiError::new(status.as_u16(), String::new());
            ApiError {
                status: parsed.status.unwrap_or(status.as_u16()),
                message: parsed.message.unwrap_or_default(),
                timestamp: parsed.timestamp.unwrap_or(fallback.timestamp),
                errors: parsed.errors,
            }
        }
        _ => {
            let reason = status.canonical_reason().unwrap_or("Request failed");
            ApiError::new(status.as_u16(), format!("Request failed with status {}: {reason}", status.as_u16()))
        }
    }
}
