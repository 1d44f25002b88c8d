//! REST API module.
//!
//! Contains all API routes and handlers. Every response is wrapped in the
//! `{ statusCode, error, message, data }` envelope.

mod admin;
mod auth;
mod books;
mod borrows;
mod maintenance;
mod permissions;
mod roles;
mod users;

pub use admin::*;
pub use auth::*;
pub use books::*;
pub use borrows::*;
pub use maintenance::*;
pub use permissions::*;
pub use roles::*;
pub use users::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::models::NewActivityLog;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub error: Option<String>,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a 200 response.
pub fn ok<T: Serialize>(message: &str, data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        status_code: StatusCode::OK.as_u16(),
        error: None,
        message: message.to_string(),
        data,
    })
}

/// Create a 201 response.
pub fn created<T: Serialize>(message: &str, data: T) -> ApiResult<T> {
    Ok(ApiResponse {
        status_code: StatusCode::CREATED.as_u16(),
        error: None,
        message: message.to_string(),
        data,
    })
}

/// Best-effort activity logging; a failed write must not fail the request.
pub(crate) async fn record_activity(state: &AppState, entry: NewActivityLog) {
    if let Err(e) = state.repo.insert_activity_log(&entry).await {
        tracing::warn!("Failed to record activity log: {}", e);
    }
}
