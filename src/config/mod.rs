//! Configuration module for the ReadCycle backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use rand::Rng;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// HMAC secret for signing JWTs
    pub jwt_secret: String,
    /// Whether the secret was generated at startup (tokens won't survive restarts)
    pub jwt_secret_generated: bool,
    /// Access token lifetime in seconds
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds
    pub refresh_token_ttl_secs: i64,
    /// Email verification token lifetime in seconds
    pub verify_token_ttl_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("RC_DB_PATH")
            .unwrap_or_else(|_| "./data/readcycle.sqlite".to_string())
            .into();

        let bind_addr = env::var("RC_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid RC_BIND_ADDR format");

        let log_level = env::var("RC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let (jwt_secret, jwt_secret_generated) = match env::var("RC_JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => (secret, false),
            _ => (generate_secret(), true),
        };

        let access_token_ttl_secs = env_i64("RC_ACCESS_TOKEN_TTL_SECS", 86_400);
        let refresh_token_ttl_secs = env_i64("RC_REFRESH_TOKEN_TTL_SECS", 8_640_000);
        let verify_token_ttl_secs = env_i64("RC_VERIFY_TOKEN_TTL_SECS", 300);

        Self {
            db_path,
            bind_addr,
            log_level,
            jwt_secret,
            jwt_secret_generated,
            access_token_ttl_secs,
            refresh_token_ttl_secs,
            verify_token_ttl_secs,
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Generate a random signing secret for when RC_JWT_SECRET is unset.
fn generate_secret() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..64)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}
