//! Auth endpoints: registration, email verification, login, token refresh,
//! logout and password changes.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::{created, ok, ApiResponse, ApiResult};
use crate::auth::{
    create_access_token, create_refresh_token, create_verify_token, decode_token, hash_password,
    peek_expired_subject, verify_password, CurrentUser, SCOPE_REFRESH, SCOPE_VERIFY,
};
use crate::errors::AppError;
use crate::models::{
    AccountResponse, ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest, User,
    UserLogin,
};
use crate::AppState;

const REFRESH_COOKIE: &str = "refresh_token";
const MIN_PASSWORD_LEN: usize = 6;

/// POST /api/v1/auth/register - Register a new member.
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<User> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if !request.email.contains('@') {
        return Err(AppError::Validation("Email is invalid".to_string()));
    }
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if state.repo.email_exists(&request.email).await? {
        return Err(AppError::Conflict(format!(
            "Email {} already exists",
            request.email
        )));
    }

    let password_hash = hash_password(&request.password)?;
    let verify_token = create_verify_token(&state.config, &request.email)?;
    let user = state
        .repo
        .create_member(&request, &password_hash, &verify_token)
        .await?;

    // Mail delivery is not wired up; surface the link in the log instead
    tracing::info!(
        email = %user.email,
        "Verification link: /api/v1/auth/verify-email?token={}",
        verify_token
    );

    created("Register account", user)
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

/// GET /api/v1/auth/verify-email - Confirm a registration.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> ApiResult<()> {
    match decode_token(&state.config, &query.token, SCOPE_VERIFY) {
        Ok(claims) => {
            state.repo.mark_email_verified(&claims.sub).await?;
            ok("Email verified", ())
        }
        Err(_) => {
            // Expired link: drop the pending registration so the email can
            // be used again
            if let Some(email) = peek_expired_subject(&state.config, &query.token) {
                state.repo.delete_unverified_user_by_email(&email).await?;
            }
            Err(AppError::Unauthorized(
                "Verification link is invalid or expired".to_string(),
            ))
        }
    }
}

/// POST /api/v1/auth/login - Authenticate and issue tokens.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .repo
        .find_user_by_email(&request.username)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Bad credentials".to_string()))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Bad credentials".to_string()));
    }
    if !user.email_verified {
        return Err(AppError::Unauthorized(
            "Your account has not been verified".to_string(),
        ));
    }
    if !user.active {
        return Err(AppError::Unauthorized("Account is deactivated".to_string()));
    }

    issue_session(&state, &user, "Login").await
}

/// GET /api/v1/auth/account - Current user info.
pub async fn get_account(Extension(current): Extension<CurrentUser>) -> ApiResult<AccountResponse> {
    ok(
        "Get account",
        AccountResponse {
            user: UserLogin {
                id: current.id,
                email: current.email,
                name: current.name,
                role: current.role,
            },
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /api/v1/auth/refresh - Rotate tokens.
///
/// The refresh token comes from the `refresh_token` cookie or, failing that,
/// a `token` query parameter. It must match the one stored for the user.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RefreshQuery>,
) -> Result<impl IntoResponse, AppError> {
    let token = cookie_value(&headers, REFRESH_COOKIE)
        .or(query.token)
        .ok_or_else(|| AppError::Unauthorized("Missing refresh token".to_string()))?;

    let claims = decode_token(&state.config, &token, SCOPE_REFRESH)?;

    let user = state
        .repo
        .find_user_by_email(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown account".to_string()))?;

    let stored = user
        .refresh_token
        .as_deref()
        .ok_or_else(|| AppError::Unauthorized("Session has been revoked".to_string()))?;

    if !constant_time_compare(&token, stored) {
        return Err(AppError::Unauthorized(
            "Refresh token does not match the active session".to_string(),
        ));
    }

    issue_session(&state, &user, "Refresh token").await
}

/// POST /api/v1/auth/logout - Revoke the stored refresh token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<impl IntoResponse, AppError> {
    state.repo.set_refresh_token(&current.email, None).await?;

    let clear_cookie = format!(
        "{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0",
        REFRESH_COOKIE
    );
    let response = ApiResponse {
        status_code: 200,
        error: None,
        message: "Logout".to_string(),
        data: (),
    };
    Ok(([(header::SET_COOKIE, clear_cookie)], response))
}

/// POST /api/v1/auth/change-password - Change the caller's password.
pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    if request.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let user = state
        .repo
        .find_user_by_id(current.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Unknown account".to_string()))?;

    if !verify_password(&request.current_password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let hash = hash_password(&request.new_password)?;
    state.repo.set_password(user.id, &hash).await?;
    ok("Change password", ())
}

/// Issue access + refresh tokens, persist the refresh token and set its cookie.
async fn issue_session(
    state: &AppState,
    user: &User,
    message: &str,
) -> Result<impl IntoResponse, AppError> {
    let access_token = create_access_token(&state.config, user)?;
    let refresh = create_refresh_token(&state.config, user)?;

    state
        .repo
        .set_refresh_token(&user.email, Some(&refresh))
        .await?;

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        REFRESH_COOKIE, refresh, state.config.refresh_token_ttl_secs
    );

    let response = ApiResponse {
        status_code: 200,
        error: None,
        message: message.to_string(),
        data: LoginResponse {
            user: UserLogin {
                id: user.id,
                email: user.email.clone(),
                name: user.name.clone(),
                role: user.role.clone(),
            },
            access_token,
        },
    };

    Ok(([(header::SET_COOKIE, cookie)], response))
}

/// Pull one cookie's value out of the Cookie header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

/// Constant-time comparison to keep token checks timing-safe.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
