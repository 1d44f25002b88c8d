//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data.

mod activity;
mod books;
mod borrows;
mod carts;
mod maintenance;
mod roles;
mod stats;
mod users;

pub use stats::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Name of the seeded administrator role.
pub const ADMIN_ROLE: &str = "admin";
/// Name of the seeded member role.
pub const USER_ROLE: &str = "user";
/// Email of the seeded administrator account.
pub const ADMIN_EMAIL: &str = "admin@readcycle.io";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations and seed the default roles.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS roles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            updated_at TEXT,
            created_by TEXT,
            updated_by TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permissions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            api_path TEXT NOT NULL,
            method TEXT NOT NULL,
            module TEXT NOT NULL,
            created_at TEXT,
            updated_at TEXT,
            created_by TEXT,
            updated_by TEXT
        );

        CREATE TABLE IF NOT EXISTS role_permissions (
            role_id INTEGER NOT NULL,
            permission_id INTEGER NOT NULL,
            PRIMARY KEY (role_id, permission_id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            date_of_birth TEXT,
            email_verified INTEGER NOT NULL DEFAULT 0,
            active INTEGER NOT NULL DEFAULT 1,
            refresh_token TEXT,
            verification_token TEXT,
            role_id INTEGER,
            created_at TEXT,
            updated_at TEXT,
            created_by TEXT,
            updated_by TEXT
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            category TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            publisher TEXT NOT NULL,
            thumb TEXT,
            description TEXT,
            quantity INTEGER NOT NULL DEFAULT 0,
            status TEXT NOT NULL DEFAULT 'AVAILABLE',
            active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT,
            updated_at TEXT,
            created_by TEXT,
            updated_by TEXT
        );

        CREATE TABLE IF NOT EXISTS borrows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            book_id INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'BORROWED',
            created_at TEXT,
            updated_at TEXT,
            created_by TEXT,
            updated_by TEXT
        );

        CREATE TABLE IF NOT EXISTS carts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            sum INTEGER NOT NULL DEFAULT 1,
            user_id INTEGER NOT NULL,
            book_id INTEGER NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS activity_logs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            activity_group TEXT NOT NULL,
            activity_type TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '[]',
            username TEXT NOT NULL DEFAULT '',
            execution_time TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS system_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            maintenance_mode INTEGER NOT NULL DEFAULT 0
        );

        INSERT OR IGNORE INTO system_config (id, maintenance_mode) VALUES (1, 0);
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for common queries
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_books_title ON books(title);
        CREATE INDEX IF NOT EXISTS idx_books_category ON books(category);
        CREATE INDEX IF NOT EXISTS idx_books_active ON books(active);
        CREATE INDEX IF NOT EXISTS idx_borrows_user_status ON borrows(user_id, status);
        CREATE INDEX IF NOT EXISTS idx_borrows_book_status ON borrows(book_id, status);
        CREATE INDEX IF NOT EXISTS idx_carts_user ON carts(user_id);
        CREATE INDEX IF NOT EXISTS idx_activity_logs_group ON activity_logs(activity_group);
        "#,
    )
    .execute(pool)
    .await?;

    // Seed the built-in roles
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO roles (name, description, active, created_at, created_by)
        VALUES ('admin', 'Full administrative access', 1, datetime('now'), 'system');

        INSERT OR IGNORE INTO roles (name, description, active, created_at, created_by)
        VALUES ('user', 'Library member', 1, datetime('now'), 'system');
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
