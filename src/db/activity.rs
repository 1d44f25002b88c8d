//! Activity log repository operations.

use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::{ActivityFilter, ActivityLog, NewActivityLog, PageQuery};

impl Repository {
    /// Persist an activity log entry. Failures are reported but should not
    /// abort the operation being logged; callers decide.
    pub async fn insert_activity_log(&self, entry: &NewActivityLog) -> Result<(), AppError> {
        let description = serde_json::to_string(&entry.description)?;

        sqlx::query(
            r#"INSERT INTO activity_logs
                (activity_group, activity_type, description, username, execution_time)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(entry.activity_group.as_str())
        .bind(entry.activity_type.as_str())
        .bind(&description)
        .bind(&entry.username)
        .bind(&entry.execution_time)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Paginated activity log, most recent first, optionally filtered by
    /// group and username.
    pub async fn list_activity_logs(
        &self,
        filter: &ActivityFilter,
        page: &PageQuery,
    ) -> Result<(Vec<ActivityLog>, i64), AppError> {
        let rows = sqlx::query(
            r#"SELECT * FROM activity_logs
               WHERE (?1 IS NULL OR activity_group = ?1)
                 AND (?2 IS NULL OR username LIKE '%' || ?2 || '%')
               ORDER BY id DESC
               LIMIT ?3 OFFSET ?4"#,
        )
        .bind(&filter.group)
        .bind(&filter.username)
        .bind(page.page_size() as i64)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM activity_logs
               WHERE (?1 IS NULL OR activity_group = ?1)
                 AND (?2 IS NULL OR username LIKE '%' || ?2 || '%')"#,
        )
        .bind(&filter.group)
        .bind(&filter.username)
        .fetch_one(self.pool())
        .await?;

        Ok((rows.iter().map(log_from_row).collect(), row.get("n")))
    }
}

fn log_from_row(row: &sqlx::sqlite::SqliteRow) -> ActivityLog {
    let description: String = row.get("description");
    ActivityLog {
        id: row.get("id"),
        activity_group: row.get("activity_group"),
        activity_type: row.get("activity_type"),
        description: serde_json::from_str(&description).unwrap_or_default(),
        username: row.get("username"),
        execution_time: row.get("execution_time"),
    }
}
