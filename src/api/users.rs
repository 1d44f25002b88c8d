//! Admin user management.
//!
//! Admin-created accounts get a server-generated password and a verification
//! link; both are written to the log because mail delivery is not wired up.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{created, ok, record_activity, ApiResult};
use crate::auth::{create_verify_token, generate_password, hash_password, CurrentUser};
use crate::errors::AppError;
use crate::models::{
    ActivityDescription, ActivityGroup, ActivityType, CreateUserRequest, NewActivityLog,
    PageQuery, Paginated, UpdateUserRequest, User, UserFilter,
};
use crate::AppState;

/// GET /api/v1/admin/users - Paginated user listing.
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Paginated<User>> {
    let (users, total) = state.repo.list_users(&filter, &page).await?;
    ok(
        "Get users",
        Paginated::new(page.page(), page.page_size(), total, users),
    )
}

/// GET /api/v1/admin/users/{id} - User detail.
pub async fn get_user(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<User> {
    let user = state
        .repo
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    ok("Get user", user)
}

/// POST /api/v1/admin/users - Create a user with a generated password.
pub async fn create_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateUserRequest>,
) -> ApiResult<User> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("Email is invalid".to_string()));
    }
    if state.repo.email_exists(&request.email).await? {
        return Err(AppError::Conflict(format!(
            "Email {} already exists",
            request.email
        )));
    }

    let password = generate_password();
    let password_hash = hash_password(&password)?;
    let verify_token = create_verify_token(&state.config, &request.email)?;
    let user = state
        .repo
        .create_user(&request, &password_hash, &verify_token, &current.email)
        .await?;

    // Logged once; there is no mail transport
    tracing::info!(
        email = %user.email,
        "Generated password: {} / verification link: /api/v1/auth/verify-email?token={}",
        password,
        verify_token
    );

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::User,
            ActivityType::CreateUser,
            vec![
                ActivityDescription::from("id", user.id, "User id"),
                ActivityDescription::from("email", &user.email, "Email"),
            ],
            &current.email,
        ),
    )
    .await;

    created("Create user", user)
}

/// PUT /api/v1/admin/users/{id} - Update a user.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> ApiResult<User> {
    let before = state
        .repo
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    let user = state.repo.update_user(id, &request, &current.email).await?;

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::User,
            ActivityType::UpdateUser,
            user_changes(&before, &user),
            &current.email,
        ),
    )
    .await;

    ok("Update user", user)
}

/// DELETE /api/v1/admin/users/{id} - Delete a user.
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    if id == current.id {
        return Err(AppError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    let user = state
        .repo
        .find_user_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
    state.repo.delete_user(id).await?;

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::User,
            ActivityType::DeleteUser,
            vec![
                ActivityDescription::from("id", user.id, "User id"),
                ActivityDescription::from("email", &user.email, "Email"),
            ],
            &current.email,
        ),
    )
    .await;

    ok("Delete user", ())
}

/// Field-level diff for the update audit entry.
fn user_changes(before: &User, after: &User) -> Vec<ActivityDescription> {
    let mut changes = vec![ActivityDescription::from("id", after.id, "User id")];
    if before.name != after.name {
        changes.push(ActivityDescription::from(
            "name",
            format!("{} -> {}", before.name, after.name),
            "Name",
        ));
    }
    if before.active != after.active {
        changes.push(ActivityDescription::from(
            "active",
            format!("{} -> {}", before.active, after.active),
            "Active",
        ));
    }
    let role_name = |u: &User| u.role.as_ref().map(|r| r.name.clone()).unwrap_or_default();
    if role_name(before) != role_name(after) {
        changes.push(ActivityDescription::from(
            "role",
            format!("{} -> {}", role_name(before), role_name(after)),
            "Role",
        ));
    }
    changes
}
