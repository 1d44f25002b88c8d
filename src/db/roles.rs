//! Role and permission repository operations.

use chrono::Utc;
use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::{
    CreatePermissionRequest, CreateRoleRequest, PageQuery, Permission, Role,
    UpdatePermissionRequest, UpdateRoleRequest,
};

impl Repository {
    // ==================== ROLE OPERATIONS ====================

    /// Find a role by name, with its permissions.
    pub async fn find_role_by_name(&self, name: &str) -> Result<Option<Role>, AppError> {
        let row = sqlx::query("SELECT * FROM roles WHERE name = ?")
            .bind(name)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => {
                let mut role = role_from_row(&row);
                role.permissions = self.permissions_for_role(role.id).await?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    /// Find a role by id, with its permissions.
    pub async fn find_role_by_id(&self, id: i64) -> Result<Option<Role>, AppError> {
        let row = sqlx::query("SELECT * FROM roles WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => {
                let mut role = role_from_row(&row);
                role.permissions = self.permissions_for_role(role.id).await?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    pub async fn role_name_exists(&self, name: &str) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM roles WHERE name = ?")
            .bind(name)
            .fetch_one(self.pool())
            .await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    /// Create a role and attach the given permissions.
    pub async fn create_role(
        &self,
        request: &CreateRoleRequest,
        actor: &str,
    ) -> Result<Role, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO roles (name, description, active, created_at, created_by) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.active as i32)
        .bind(&now)
        .bind(actor)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.set_role_permissions(id, &request.permission_ids).await?;

        self.find_role_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("Role vanished after insert".to_string()))
    }

    /// Update a role and optionally replace its permission set.
    pub async fn update_role(
        &self,
        id: i64,
        request: &UpdateRoleRequest,
        actor: &str,
    ) -> Result<Role, AppError> {
        let existing = self
            .find_role_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Role with id {} does not exist", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let description = request.description.clone().or(existing.description.clone());
        let active = request.active.unwrap_or(existing.active);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            "UPDATE roles SET name = ?, description = ?, active = ?, updated_at = ?, updated_by = ? WHERE id = ?",
        )
        .bind(name)
        .bind(&description)
        .bind(active as i32)
        .bind(&now)
        .bind(actor)
        .bind(id)
        .execute(self.pool())
        .await?;

        if let Some(ids) = &request.permission_ids {
            self.set_role_permissions(id, ids).await?;
        }

        self.find_role_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("Role vanished after update".to_string()))
    }

    /// Delete a role and its permission links.
    pub async fn delete_role(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM roles WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Role with id {} does not exist",
                id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    /// List roles with their permissions.
    pub async fn list_roles(&self, page: &PageQuery) -> Result<(Vec<Role>, i64), AppError> {
        let rows = sqlx::query("SELECT * FROM roles ORDER BY id LIMIT ? OFFSET ?")
            .bind(page.page_size() as i64)
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut role = role_from_row(row);
            role.permissions = self.permissions_for_role(role.id).await?;
            roles.push(role);
        }

        let row = sqlx::query("SELECT COUNT(*) AS n FROM roles")
            .fetch_one(self.pool())
            .await?;

        Ok((roles, row.get("n")))
    }

    /// Replace a role's permission links with the given set.
    async fn set_role_permissions(&self, role_id: i64, ids: &[i64]) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = ?")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        for pid in ids {
            // Unknown ids are skipped rather than failing the whole update
            let exists = sqlx::query("SELECT COUNT(*) AS n FROM permissions WHERE id = ?")
                .bind(pid)
                .fetch_one(&mut *tx)
                .await?;
            let n: i64 = exists.get("n");
            if n == 0 {
                continue;
            }
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?, ?)")
                .bind(role_id)
                .bind(pid)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Permissions attached to a role.
    pub async fn permissions_for_role(&self, role_id: i64) -> Result<Vec<Permission>, AppError> {
        let rows = sqlx::query(
            r#"SELECT p.* FROM permissions p
               JOIN role_permissions rp ON rp.permission_id = p.id
               WHERE rp.role_id = ?
               ORDER BY p.id"#,
        )
        .bind(role_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(permission_from_row).collect())
    }

    // ==================== PERMISSION OPERATIONS ====================

    pub async fn find_permission_by_id(&self, id: i64) -> Result<Option<Permission>, AppError> {
        let row = sqlx::query("SELECT * FROM permissions WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(permission_from_row))
    }

    /// Check for an existing permission with the same path/method/module.
    pub async fn permission_exists(
        &self,
        api_path: &str,
        method: &str,
        module: &str,
    ) -> Result<bool, AppError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM permissions WHERE api_path = ? AND method = ? AND module = ?",
        )
        .bind(api_path)
        .bind(method)
        .bind(module)
        .fetch_one(self.pool())
        .await?;
        let n: i64 = row.get("n");
        Ok(n > 0)
    }

    pub async fn create_permission(
        &self,
        request: &CreatePermissionRequest,
        actor: &str,
    ) -> Result<Permission, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO permissions (name, api_path, method, module, created_at, created_by)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&request.name)
        .bind(&request.api_path)
        .bind(&request.method)
        .bind(&request.module)
        .bind(&now)
        .bind(actor)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.find_permission_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("Permission vanished after insert".to_string()))
    }

    pub async fn update_permission(
        &self,
        id: i64,
        request: &UpdatePermissionRequest,
        actor: &str,
    ) -> Result<Permission, AppError> {
        let existing = self
            .find_permission_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Permission with id {} does not exist", id)))?;

        let name = request.name.as_ref().unwrap_or(&existing.name);
        let api_path = request.api_path.as_ref().unwrap_or(&existing.api_path);
        let method = request.method.as_ref().unwrap_or(&existing.method);
        let module = request.module.as_ref().unwrap_or(&existing.module);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"UPDATE permissions SET name = ?, api_path = ?, method = ?, module = ?,
               updated_at = ?, updated_by = ? WHERE id = ?"#,
        )
        .bind(name)
        .bind(api_path)
        .bind(method)
        .bind(module)
        .bind(&now)
        .bind(actor)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.find_permission_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal("Permission vanished after update".to_string()))
    }

    pub async fn delete_permission(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM role_permissions WHERE permission_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM permissions WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Permission with id {} does not exist",
                id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_permissions(
        &self,
        page: &PageQuery,
    ) -> Result<(Vec<Permission>, i64), AppError> {
        let rows = sqlx::query("SELECT * FROM permissions ORDER BY id LIMIT ? OFFSET ?")
            .bind(page.page_size() as i64)
            .bind(page.offset())
            .fetch_all(self.pool())
            .await?;

        let row = sqlx::query("SELECT COUNT(*) AS n FROM permissions")
            .fetch_one(self.pool())
            .await?;

        Ok((
            rows.iter().map(permission_from_row).collect(),
            row.get("n"),
        ))
    }
}

fn role_from_row(row: &sqlx::sqlite::SqliteRow) -> Role {
    let active: i32 = row.get("active");
    Role {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        active: active != 0,
        permissions: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    }
}

fn permission_from_row(row: &sqlx::sqlite::SqliteRow) -> Permission {
    Permission {
        id: row.get("id"),
        name: row.get("name"),
        api_path: row.get("api_path"),
        method: row.get("method"),
        module: row.get("module"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    }
}
