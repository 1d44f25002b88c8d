//! ReadCycle Backend
//!
//! A production-grade REST backend for library book lending with SQLite
//! persistence and JWT authentication.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ReadCycle Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.jwt_secret_generated {
        tracing::warn!(
            "No JWT secret configured (RC_JWT_SECRET). Using a generated secret; \
             issued tokens will not survive a restart!"
        );
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let repo = Arc::new(Repository::new(pool));

    // Seed the admin account on first run
    let password = auth::generate_password();
    let password_hash = auth::hash_password(&password)?;
    if repo.ensure_admin_account(&password_hash).await? {
        tracing::info!(
            "Created admin account {} with password: {}",
            db::ADMIN_EMAIL,
            password
        );
    }

    // Create application state
    let state = AppState {
        repo,
        config: Arc::new(config.clone()),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Unauthenticated routes
    let public_routes = Router::new()
        .route("/auth/register", post(api::register))
        .route("/auth/verify-email", get(api::verify_email))
        .route("/auth/login", post(api::login))
        .route("/auth/refresh", get(api::refresh_token))
        .route("/books", get(api::list_books))
        .route("/books/{id}", get(api::get_book))
        .route("/maintenance", get(api::maintenance_status));

    // Routes for any logged-in user
    let authed_routes = Router::new()
        .route("/auth/account", get(api::get_account))
        .route("/auth/logout", post(api::logout))
        .route("/auth/change-password", post(api::change_password))
        .route("/add-to-cart", post(api::add_to_cart))
        .route("/carts", get(api::list_carts))
        .route("/carts/{id}", delete(api::delete_cart))
        .route("/borrow", post(api::borrow_books))
        .route("/return-book", put(api::return_book))
        .route("/borrow-history", get(api::borrow_history))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Routes gated on the admin role or an explicit permission
    let admin_routes = Router::new()
        .route(
            "/admin/books",
            get(api::list_books_admin).post(api::create_book),
        )
        .route("/admin/books/bulk", post(api::bulk_create_books))
        .route(
            "/admin/books/{id}",
            put(api::update_book)
                .delete(api::delete_book)
                .patch(api::toggle_book),
        )
        .route("/admin/users", get(api::list_users).post(api::create_user))
        .route(
            "/admin/users/{id}",
            get(api::get_user)
                .put(api::update_user)
                .delete(api::delete_user),
        )
        .route("/admin/roles", get(api::list_roles).post(api::create_role))
        .route(
            "/admin/roles/{id}",
            get(api::get_role)
                .put(api::update_role)
                .delete(api::delete_role),
        )
        .route(
            "/admin/permissions",
            get(api::list_permissions).post(api::create_permission),
        )
        .route(
            "/admin/permissions/{id}",
            get(api::get_permission)
                .put(api::update_permission)
                .delete(api::delete_permission),
        )
        .route("/admin/maintenance", patch(api::set_maintenance))
        .route("/admin/activity-logs", get(api::list_activity_logs))
        .route("/admin/dashboard", get(api::dashboard))
        .route("/admin/dashboard/books", get(api::dashboard_books))
        // require_auth must run before require_admin, so it is layered last
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    let api_routes = public_routes.merge(authed_routes).merge(admin_routes);

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::maintenance_gate,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
