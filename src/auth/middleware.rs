//! Request middleware: bearer-token authentication, admin gating and the
//! maintenance switch.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use super::tokens::{decode_token, SCOPE_ACCESS};
use crate::errors::AppError;
use crate::models::RoleBrief;
use crate::AppState;

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Option<RoleBrief>,
}

/// Authenticate the request from its `Authorization: Bearer` header and load
/// the caller from the database.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;

    let claims = decode_token(&state.config, token, SCOPE_ACCESS)?;

    let user = state
        .repo
        .find_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown account".to_string()))?;

    if !user.active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

/// Allow the request through when the caller is an admin, or when their role
/// carries a permission matching the request method and path prefix.
/// Must run after [`require_auth`].
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Missing access token".to_string()))?;

    let role = user
        .role
        .ok_or_else(|| AppError::Forbidden("You are not allowed to access this resource".to_string()))?;

    if role.name == crate::db::ADMIN_ROLE {
        return Ok(next.run(request).await);
    }

    let permissions = state.repo.permissions_for_role(role.id).await?;
    let method = request.method().as_str();
    let path = request.uri().path();

    let allowed = permissions
        .iter()
        .any(|p| p.method.eq_ignore_ascii_case(method) && path.starts_with(&p.api_path));

    if allowed {
        Ok(next.run(request).await)
    } else {
        Err(AppError::Forbidden(
            "You are not allowed to access this resource".to_string(),
        ))
    }
}

/// Paths that stay reachable while maintenance mode is on.
const MAINTENANCE_ALLOWLIST: &[&str] = &[
    "/health",
    "/api/v1/maintenance",
    "/api/v1/admin/maintenance",
    "/api/v1/auth/login",
];

/// Reject requests with 503 while the system is in maintenance mode, except
/// for the endpoints needed to observe and end it.
pub async fn maintenance_gate(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();
    if MAINTENANCE_ALLOWLIST.contains(&path) {
        return Ok(next.run(request).await);
    }

    if state.repo.maintenance_mode().await? {
        return Err(AppError::Maintenance(
            "Service currently in maintenance".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
