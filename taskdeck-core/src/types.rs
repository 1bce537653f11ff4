use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::format::now_timestamp;

/// Message carried by the synthetic error produced when no server response
/// was received at all.
pub const NETWORK_ERROR_MESSAGE: &str = "Unable to connect to server. Please check your connection.";

// ─── Task ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreateRequest {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

/// Partial update: absent fields are left untouched by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

// ─── Querying ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Title,
    DueDate,
    #[default]
    CreatedAt,
}

impl SortBy {
    pub const ALL: [SortBy; 3] = [SortBy::CreatedAt, SortBy::Title, SortBy::DueDate];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Title => "title",
            SortBy::DueDate => "dueDate",
            SortBy::CreatedAt => "createdAt",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortBy::Title => "Title",
            SortBy::DueDate => "Due Date",
            SortBy::CreatedAt => "Created Date",
        }
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortBy::Title),
            "dueDate" => Ok(SortBy::DueDate),
            "createdAt" => Ok(SortBy::CreatedAt),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortDirection::Asc => "Ascending",
            SortDirection::Desc => "Descending",
        }
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("unknown sort direction: {other}")),
        }
    }
}

/// Parameters of a list request. `None` fields are omitted from the query
/// string so the backend defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResponse<T> {
    pub content: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub page: u32,
    pub size: u32,
}

impl<T> PagedResponse<T> {
    /// Emptiness is decided by the content alone; `total_pages` may be 0 or 1
    /// for an empty result depending on the backend.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// The uniform failure shape returned by every gateway operation.
///
/// `status == 0` means no server response was received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    NotFound,
    Validation,
    Server,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            timestamp: now_timestamp(),
            errors: None,
        }
    }

    pub fn network() -> Self {
        Self::new(0, NETWORK_ERROR_MESSAGE)
    }

    pub fn not_found(id: i64) -> Self {
        Self::new(404, format!("Task not found with id: {id}"))
    }

    pub fn validation(errors: Vec<FieldError>) -> Self {
        Self {
            errors: Some(errors),
            ..Self::new(400, "Validation failed")
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.status {
            0 => ErrorKind::Network,
            404 => ErrorKind::NotFound,
            400 if self.errors.as_ref().is_some_and(|e| !e.is_empty()) => ErrorKind::Validation,
            _ => ErrorKind::Server,
        }
    }

    pub fn is_network(&self) -> bool {
        self.kind() == ErrorKind::Network
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// The server's message for `field`, if it reported one.
    pub fn field_message(&self, field: &str) -> Option<&str> {
        self.errors
            .as_ref()?
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

// ─── Gateway Interface ──────────────────────────────────────────────────────

/// CRUD operations against the task backend.
#[async_trait]
pub trait TaskGateway: Send + Sync {
    async fn list(&self, params: &TaskQueryParams) -> Result<PagedResponse<Task>, ApiError>;
    async fn get_by_id(&self, id: i64) -> Result<Task, ApiError>;
    async fn create(&self, request: &TaskCreateRequest) -> Result<Task, ApiError>;
    async fn update(&self, id: i64, request: &TaskUpdateRequest) -> Result<Task, ApiError>;
    async fn toggle(&self, id: i64) -> Result<Task, ApiError>;
    async fn delete(&self, id: i64) -> Result<(), ApiError>;
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Network => "network",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
        };
        f.write_str(name)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
