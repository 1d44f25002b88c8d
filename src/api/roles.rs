//! Admin role management.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{created, ok, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateRoleRequest, PageQuery, Paginated, Role, UpdateRoleRequest};
use crate::AppState;

/// GET /api/v1/admin/roles - Paginated role listing with permissions.
pub async fn list_roles(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Paginated<Role>> {
    let (roles, total) = state.repo.list_roles(&page).await?;
    ok(
        "Get roles",
        Paginated::new(page.page(), page.page_size(), total, roles),
    )
}

/// GET /api/v1/admin/roles/{id} - Role detail.
pub async fn get_role(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Role> {
    let role = state
        .repo
        .find_role_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Role {} not found", id)))?;
    ok("Get role", role)
}

/// POST /api/v1/admin/roles - Create a role.
pub async fn create_role(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateRoleRequest>,
) -> ApiResult<Role> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if state.repo.role_name_exists(&request.name).await? {
        return Err(AppError::Conflict(format!(
            "Role {} already exists",
            request.name
        )));
    }

    let role = state.repo.create_role(&request, &current.email).await?;
    created("Create role", role)
}

/// PUT /api/v1/admin/roles/{id} - Update a role.
pub async fn update_role(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateRoleRequest>,
) -> ApiResult<Role> {
    if let Some(name) = &request.name {
        let existing = state.repo.find_role_by_name(name).await?;
        if existing.map(|r| r.id != id).unwrap_or(false) {
            return Err(AppError::Conflict(format!("Role {} already exists", name)));
        }
    }

    let role = state.repo.update_role(id, &request, &current.email).await?;
    ok("Update role", role)
}

/// DELETE /api/v1/admin/roles/{id} - Delete a role and its permission links.
pub async fn delete_role(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<()> {
    state.repo.delete_role(id).await?;
    ok("Delete role", ())
}
