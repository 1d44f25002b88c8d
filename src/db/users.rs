//! User repository operations.

use chrono::Utc;
use sqlx::Row;

use super::{Repository, ADMIN_EMAIL, ADMIN_ROLE, USER_ROLE};
use crate::errors::AppError;
use crate::models::{
    CreateUserRequest, PageQuery, RegisterRequest, RoleBrief, UpdateUserRequest, User, UserFilter,
};

const USER_COLUMNS: &str = r#"
    u.id, u.name, u.email, u.password_hash, u.date_of_birth, u.email_verified,
    u.active, u.refresh_token, u.verification_token, u.created_at, u.updated_at,
    u.created_by, u.updated_by, r.id AS role_id, r.name AS role_name
"#;

impl Repository {
    /// Find a user by email, with their role.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u LEFT JOIN roles r ON r.id = u.role_id WHERE u.email = ?"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Find a user by id, with their role.
    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users u LEFT JOIN roles r ON r.id = u.role_id WHERE u.id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool())
            .await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    /// Create a self-registered, unverified member with the `user` role.
    pub async fn create_member(
        &self,
        request: &RegisterRequest,
        password_hash: &str,
        verification_token: &str,
    ) -> Result<User, AppError> {
        let role = self
            .find_role_by_name(USER_ROLE)
            .await?
            .ok_or_else(|| AppError::Internal("Default role missing".to_string()))?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"INSERT INTO users
                (name, email, password_hash, date_of_birth, email_verified, active,
                 verification_token, role_id, created_at, created_by)
               VALUES (?, ?, ?, ?, 0, 1, ?, ?, ?, ?)"#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(password_hash)
        .bind(&request.date_of_birth)
        .bind(verification_token)
        .bind(role.id)
        .bind(&now)
        .bind(&request.email)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))
    }

    /// Admin-side user creation with a server-generated password.
    pub async fn create_user(
        &self,
        request: &CreateUserRequest,
        password_hash: &str,
        verification_token: &str,
        actor: &str,
    ) -> Result<User, AppError> {
        let role_id = match request.role_id {
            Some(id) => {
                self.find_role_by_id(id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Role with id {} does not exist", id)))?;
                id
            }
            None => {
                self.find_role_by_name(USER_ROLE)
                    .await?
                    .ok_or_else(|| AppError::Internal("Default role missing".to_string()))?
                    .id
            }
        };
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"INSERT INTO users
                (name, email, password_hash, date_of_birth, email_verified, active,
                 verification_token, role_id, created_at, created_by)
               VALUES (?, ?, ?, ?, 0, 1, ?, ?, ?, ?)"#,
        )
        .bind(&request.name)
        .bind(&request.email)
        .bind(password_hash)
        .bind(&request.date_of_birth)
        .bind(verification_token)
        .bind(role_id)
        .bind(&now)
        .bind(actor)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("User vanished after insert".to_string()))
    }

    /// Update a user's profile fields.
    pub async fn update_user(
        &self,
        id: i64,
        request: &UpdateUserRequest,
        actor: &str,
    ) -> Result<User, AppError> {
        let existing = self
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} does not exist", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let date_of_birth = request
            .date_of_birth
            .clone()
            .or(existing.date_of_birth.clone());
        let active = request.active.unwrap_or(existing.active);
        let role_id = match request.role_id {
            Some(rid) => {
                self.find_role_by_id(rid)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Role with id {} does not exist", rid)))?;
                Some(rid)
            }
            None => existing.role.as_ref().map(|r| r.id),
        };
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"UPDATE users SET name = ?, date_of_birth = ?, active = ?, role_id = ?,
                updated_at = ?, updated_by = ? WHERE id = ?"#,
        )
        .bind(name)
        .bind(&date_of_birth)
        .bind(active as i32)
        .bind(role_id)
        .bind(&now)
        .bind(actor)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("User vanished after update".to_string()))
    }

    /// Delete a user.
    pub async fn delete_user(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "User with id {} does not exist",
                id
            )));
        }
        Ok(())
    }

    /// Remove a pending registration whose verification token expired.
    pub async fn delete_unverified_user_by_email(&self, email: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM users WHERE email = ? AND email_verified = 0")
            .bind(email)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// List users with optional name/email substring filters.
    pub async fn list_users(
        &self,
        filter: &UserFilter,
        page: &PageQuery,
    ) -> Result<(Vec<User>, i64), AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {USER_COLUMNS} FROM users u LEFT JOIN roles r ON r.id = u.role_id
               WHERE (?1 IS NULL OR u.name LIKE '%' || ?1 || '%')
                 AND (?2 IS NULL OR u.email LIKE '%' || ?2 || '%')
               ORDER BY u.id
               LIMIT ?3 OFFSET ?4"#
        ))
        .bind(&filter.name)
        .bind(&filter.email)
        .bind(page.page_size() as i64)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM users u
               WHERE (?1 IS NULL OR u.name LIKE '%' || ?1 || '%')
                 AND (?2 IS NULL OR u.email LIKE '%' || ?2 || '%')"#,
        )
        .bind(&filter.name)
        .bind(&filter.email)
        .fetch_one(self.pool())
        .await?;

        Ok((rows.iter().map(user_from_row).collect(), row.get("n")))
    }

    /// Persist (or clear) the user's refresh token.
    pub async fn set_refresh_token(
        &self,
        email: &str,
        token: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET refresh_token = ? WHERE email = ?")
            .bind(token)
            .bind(email)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Mark the account's email as verified and drop the token.
    pub async fn mark_email_verified(&self, email: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = 1, verification_token = NULL WHERE email = ?",
        )
        .bind(email)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "No account registered for {}",
                email
            )));
        }
        Ok(())
    }

    /// Store a new password hash.
    pub async fn set_password(&self, id: i64, password_hash: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(&now)
            .bind(id)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    /// Create the built-in admin account if it does not exist yet.
    /// Returns true when the account was created by this call.
    pub async fn ensure_admin_account(&self, password_hash: &str) -> Result<bool, AppError> {
        if self.email_exists(ADMIN_EMAIL).await? {
            return Ok(false);
        }
        let role = self
            .find_role_by_name(ADMIN_ROLE)
            .await?
            .ok_or_else(|| AppError::Internal("Admin role missing".to_string()))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"INSERT INTO users
                (name, email, password_hash, email_verified, active, role_id, created_at, created_by)
               VALUES ('Administrator', ?, ?, 1, 1, ?, ?, 'system')"#,
        )
        .bind(ADMIN_EMAIL)
        .bind(password_hash)
        .bind(role.id)
        .bind(&now)
        .execute(self.pool())
        .await?;

        Ok(true)
    }
}

pub(crate) fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    let email_verified: i32 = row.get("email_verified");
    let active: i32 = row.get("active");
    let role_id: Option<i64> = row.get("role_id");
    let role_name: Option<String> = row.get("role_name");

    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        date_of_birth: row.get("date_of_birth"),
        email_verified: email_verified != 0,
        active: active != 0,
        refresh_token: row.get("refresh_token"),
        verification_token: row.get("verification_token"),
        role: role_id
            .zip(role_name)
            .map(|(id, name)| RoleBrief { id, name }),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    }
}
