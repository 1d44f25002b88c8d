//! System maintenance flag.

use sqlx::Row;

use super::Repository;
use crate::errors::AppError;

impl Repository {
    /// Whether maintenance mode is currently on.
    pub async fn maintenance_mode(&self) -> Result<bool, AppError> {
        let row = sqlx::query("SELECT maintenance_mode FROM system_config WHERE id = 1")
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => {
                let mode: i32 = row.get("maintenance_mode");
                Ok(mode != 0)
            }
            None => {
                // Row is seeded by migrations; recreate it if someone removed it
                sqlx::query("INSERT OR IGNORE INTO system_config (id, maintenance_mode) VALUES (1, 0)")
                    .execute(self.pool())
                    .await?;
                Ok(false)
            }
        }
    }

    /// Set maintenance mode and return the new state.
    pub async fn set_maintenance_mode(&self, on: bool) -> Result<bool, AppError> {
        sqlx::query("UPDATE system_config SET maintenance_mode = ? WHERE id = 1")
            .bind(on as i32)
            .execute(self.pool())
            .await?;
        Ok(on)
    }
}
