//! Maintenance mode endpoints.
//!
//! While maintenance is on, the gate in `auth::middleware` rejects everything
//! outside a small allowlist so admins can still log in and turn it off.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult};
use crate::errors::AppError;
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStatus {
    pub maintenance_mode: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceQuery {
    #[serde(default)]
    pub maintenance_mode: Option<bool>,
}

/// GET /api/v1/maintenance - Current maintenance flag. Public.
pub async fn maintenance_status(State(state): State<AppState>) -> ApiResult<MaintenanceStatus> {
    let on = state.repo.maintenance_mode().await?;
    ok(
        "Get maintenance mode",
        MaintenanceStatus {
            maintenance_mode: on,
        },
    )
}

/// PATCH /api/v1/admin/maintenance?maintenanceMode= - Flip the flag.
pub async fn set_maintenance(
    State(state): State<AppState>,
    Query(query): Query<MaintenanceQuery>,
) -> ApiResult<MaintenanceStatus> {
    let on = query.maintenance_mode.ok_or_else(|| {
        AppError::BadRequest("maintenanceMode query parameter is required".to_string())
    })?;

    let current = state.repo.set_maintenance_mode(on).await?;
    ok(
        "Set maintenance mode",
        MaintenanceStatus {
            maintenance_mode: current,
        },
    )
}
