//! Admin permission management.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{created, ok, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    CreatePermissionRequest, PageQuery, Paginated, Permission, UpdatePermissionRequest,
};
use crate::AppState;

/// GET /api/v1/admin/permissions - Paginated permission listing.
pub async fn list_permissions(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Paginated<Permission>> {
    let (permissions, total) = state.repo.list_permissions(&page).await?;
    ok(
        "Get permissions",
        Paginated::new(page.page(), page.page_size(), total, permissions),
    )
}

/// GET /api/v1/admin/permissions/{id} - Permission detail.
pub async fn get_permission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Permission> {
    let permission = state
        .repo
        .find_permission_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Permission {} not found", id)))?;
    ok("Get permission", permission)
}

/// POST /api/v1/admin/permissions - Create a permission.
pub async fn create_permission(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreatePermissionRequest>,
) -> ApiResult<Permission> {
    if request.api_path.trim().is_empty() || request.method.trim().is_empty() {
        return Err(AppError::Validation(
            "apiPath and method are required".to_string(),
        ));
    }
    if state
        .repo
        .permission_exists(&request.api_path, &request.method, &request.module)
        .await?
    {
        return Err(AppError::Conflict(
            "Permission with the same path, method and module already exists".to_string(),
        ));
    }

    let permission = state
        .repo
        .create_permission(&request, &current.email)
        .await?;
    created("Create permission", permission)
}

/// PUT /api/v1/admin/permissions/{id} - Update a permission.
pub async fn update_permission(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePermissionRequest>,
) -> ApiResult<Permission> {
    let permission = state
        .repo
        .update_permission(id, &request, &current.email)
        .await?;
    ok("Update permission", permission)
}

/// DELETE /api/v1/admin/permissions/{id} - Delete a permission.
pub async fn delete_permission(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.repo.delete_permission(id).await?;
    ok("Delete permission", ())
}
