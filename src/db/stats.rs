//! Dashboard statistics queries.

use serde::Serialize;
use sqlx::Row;

use super::{Repository, ADMIN_ROLE, USER_ROLE};
use crate::errors::AppError;
use crate::models::BorrowStatus;

/// Headline counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub count_user: i64,
    pub count_admin: i64,
    pub count_book: i64,
}

/// Per-title stock and circulation numbers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookStats {
    pub category: String,
    pub title: String,
    pub total_qty: i64,
    pub current_qty: i64,
    pub borrow_qty: i64,
}

impl Repository {
    pub async fn dashboard_stats(&self) -> Result<DashboardStats, AppError> {
        let count_user = self.count_users_with_role(USER_ROLE).await?;
        let count_admin = self.count_users_with_role(ADMIN_ROLE).await?;
        let count_book = self.count_books().await?;

        Ok(DashboardStats {
            count_user,
            count_admin,
            count_book,
        })
    }

    /// Stock versus circulation for every book. `borrowQty` counts copies
    /// currently out; `totalQty` is what the library owns in total.
    pub async fn book_stats(&self) -> Result<Vec<BookStats>, AppError> {
        let rows = sqlx::query(
            r#"SELECT b.category, b.title, b.quantity,
                      (SELECT COUNT(*) FROM borrows bw
                       WHERE bw.book_id = b.id AND bw.status = ?) AS borrowed
               FROM books b
               ORDER BY b.title"#,
        )
        .bind(BorrowStatus::Borrowed.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let current_qty: i64 = row.get("quantity");
                let borrow_qty: i64 = row.get("borrowed");
                BookStats {
                    category: row.get("category"),
                    title: row.get("title"),
                    total_qty: current_qty + borrow_qty,
                    current_qty,
                    borrow_qty,
                }
            })
            .collect())
    }

    async fn count_users_with_role(&self, role_name: &str) -> Result<i64, AppError> {
        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM users u
               JOIN roles r ON r.id = u.role_id
               WHERE r.name = ?"#,
        )
        .bind(role_name)
        .fetch_one(self.pool())
        .await?;
        Ok(row.get("n"))
    }
}
