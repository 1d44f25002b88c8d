//! JWT issuing and validation.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::errors::AppError;
use crate::models::User;

pub const SCOPE_ACCESS: &str = "access";
pub const SCOPE_REFRESH: &str = "refresh";
pub const SCOPE_VERIFY: &str = "verify";

/// User identity embedded in access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUser {
    pub id: i64,
    pub email: String,
    pub name: String,
}

/// JWT claims. `sub` is the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<TokenUser>,
}

fn issue(
    config: &Config,
    sub: &str,
    scope: &str,
    ttl_secs: i64,
    user: Option<TokenUser>,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        iat: now,
        exp: now + ttl_secs,
        scope: scope.to_string(),
        user,
    };

    let token = jsonwebtoken::encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn create_access_token(config: &Config, user: &User) -> Result<String, AppError> {
    issue(
        config,
        &user.email,
        SCOPE_ACCESS,
        config.access_token_ttl_secs,
        Some(TokenUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }),
    )
}

pub fn create_refresh_token(config: &Config, user: &User) -> Result<String, AppError> {
    issue(
        config,
        &user.email,
        SCOPE_REFRESH,
        config.refresh_token_ttl_secs,
        Some(TokenUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }),
    )
}

pub fn create_verify_token(config: &Config, email: &str) -> Result<String, AppError> {
    issue(config, email, SCOPE_VERIFY, config.verify_token_ttl_secs, None)
}

/// Decode a token and check it carries the expected scope.
pub fn decode_token(config: &Config, token: &str, scope: &str) -> Result<Claims, AppError> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &Validation::new(Algorithm::HS512),
    )?;

    if data.claims.scope != scope {
        return Err(AppError::Unauthorized(format!(
            "Expected a {} token",
            scope
        )));
    }
    Ok(data.claims)
}

/// Extract the subject of an expired verification token without validating
/// its lifetime, so the pending registration can be cleaned up.
pub fn peek_expired_subject(config: &Config, token: &str) -> Option<String> {
    let mut validation = Validation::new(Algorithm::HS512);
    validation.validate_exp = false;

    jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    )
    .ok()
    .filter(|data| data.claims.scope == SCOPE_VERIFY)
    .map(|data| data.claims.sub)
}
