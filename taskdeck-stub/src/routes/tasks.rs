use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;
use taskdeck_core::{
    SortBy, SortDirection, TaskCreateRequest, TaskGateway, TaskQueryParams, TaskUpdateRequest,
};

use crate::error::StubError;

type Gateway = Arc<dyn TaskGateway>;

// ─── Query ───────────────────────────────────────────────────────────────────

/// Raw list query. Sort values are kept as strings so unknown ones can fall
/// back instead of failing the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub is_completed: Option<bool>,
    pub due_date_from: Option<String>,
    pub due_date_to: Option<String>,
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl ListQuery {
    pub fn into_params(self) -> TaskQueryParams {
        let sort_by = self
            .sort_by
            .and_then(|s| s.parse::<SortBy>().ok())
            .unwrap_or(SortBy::CreatedAt);
        let sort_direction = match self.sort_direction.as_deref() {
            Some(d) if d.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };

        TaskQueryParams {
            is_completed: self.is_completed,
            due_date_from: self.due_date_from.filter(|s| !s.is_empty()),
            due_date_to: self.due_date_to.filter(|s| !s.is_empty()),
            sort_by: Some(sort_by),
            sort_direction: Some(sort_direction),
            page: Some(self.page.unwrap_or(0)),
            size: Some(self.size.unwrap_or(10)),
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, StubError> {
    raw.parse()
        .map_err(|_| StubError::BadRequest(format!("Invalid task id: {raw}")))
}

// ─── Handlers ────────────────────────────────────────────────────────────────

pub async fn list_tasks(
    State(gateway): State<Gateway>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<impl IntoResponse, StubError> {
    let Query(query) = query?;
    let page = gateway.list(&query.into_params()).await?;
    Ok(axum::Json(page))
}

pub async fn get_task(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StubError> {
    let task = gateway.get_by_id(parse_id(&id)?).await?;
    Ok(axum::Json(task))
}

pub async fn create_task(
    State(gateway): State<Gateway>,
    body: Result<axum::Json<TaskCreateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, StubError> {
    let axum::Json(body) = body?;
    let task = gateway.create(&body).await?;
    tracing::info!(id = task.id, "created task");
    Ok((StatusCode::CREATED, axum::Json(task)))
}

pub async fn update_task(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
    body: Result<axum::Json<TaskUpdateRequest>, JsonRejection>,
) -> Result<impl IntoResponse, StubError> {
    let id = parse_id(&id)?;
    let axum::Json(body) = body?;
    let task = gateway.update(id, &body).await?;
    tracing::info!(id, "updated task");
    Ok(axum::Json(task))
}

pub async fn toggle_task(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StubError> {
    let task = gateway.toggle(parse_id(&id)?).await?;
    tracing::info!(id = task.id, completed = task.is_completed, "toggled task");
    Ok(axum::Json(task))
}

pub async fn delete_task(
    State(gateway): State<Gateway>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StubError> {
    let id = parse_id(&id)?;
    gateway.delete(id).await?;
    tracing::info!(id, "deleted task");
    Ok(StatusCode::NO_CONTENT)
}
