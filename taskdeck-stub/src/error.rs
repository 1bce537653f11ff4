use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use taskdeck_core::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    BadRequest(String),
}

impl From<JsonRejection> for StubError {
    fn from(rejection: JsonRejection) -> Self {
        StubError::BadRequest(format!("Malformed request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for StubError {
    fn from(rejection: QueryRejection) -> Self {
        StubError::BadRequest(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl IntoResponse for StubError {
    fn into_response(self) -> Response {
        let body = match self {
            StubError::Api(err) => err,
            StubError::BadRequest(message) => ApiError::new(400, message),
        };
        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        tracing::debug!(status = body.status, message = %body.message, "request rejected");

        (status, axum::Json(body)).into_response()
    }
}
