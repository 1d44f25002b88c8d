//! Borrow repository operations.
//!
//! Checkout and return run inside transactions so stock counts stay consistent.

use chrono::Utc;
use sqlx::Row;

use super::books::book_from_row;
use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Book, BookStatus, Borrow, BorrowDetail, BorrowStatus, BorrowUser, PageQuery, User,
};

const BORROW_COLUMNS: &str = r#"
    bw.id AS bw_id, bw.status AS bw_status, bw.created_at AS bw_created_at,
    bw.updated_at AS bw_updated_at, bw.created_by AS bw_created_by, bw.updated_by AS bw_updated_by,
    u.id AS u_id, u.name AS u_name, u.email AS u_email,
    b.id, b.category, b.title, b.author, b.publisher, b.thumb, b.description,
    b.quantity, b.status, b.active, b.created_at, b.updated_at, b.created_by, b.updated_by
"#;

impl Repository {
    /// Check out a list of books for a member.
    ///
    /// For each book: stock must be positive; the quantity is decremented and
    /// the status flips to UNAVAILABLE when it reaches zero. Matching cart rows
    /// are cleared. The whole checkout is one transaction.
    pub async fn checkout(
        &self,
        user: &User,
        details: &[BorrowDetail],
        actor: &str,
    ) -> Result<Vec<Borrow>, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool().begin().await?;
        let mut borrows = Vec::with_capacity(details.len());

        for detail in details {
            let row = sqlx::query("SELECT * FROM books WHERE id = ?")
                .bind(detail.book_id)
                .fetch_optional(&mut *tx)
                .await?;
            let book = row.as_ref().map(book_from_row).ok_or_else(|| {
                AppError::NotFound(format!("Book with id {} does not exist", detail.book_id))
            })?;

            if book.quantity == 0 {
                return Err(AppError::Validation(
                    "Sorry the book you borrow is unavailable".to_string(),
                ));
            }

            let new_quantity = book.quantity - 1;
            let new_status = if new_quantity == 0 {
                BookStatus::Unavailable
            } else {
                book.status
            };

            sqlx::query(
                "UPDATE books SET quantity = ?, status = ?, updated_at = ?, updated_by = ? WHERE id = ?",
            )
            .bind(new_quantity)
            .bind(new_status.as_str())
            .bind(&now)
            .bind(actor)
            .bind(book.id)
            .execute(&mut *tx)
            .await?;

            let result = sqlx::query(
                "INSERT INTO borrows (user_id, book_id, status, created_at, created_by) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(user.id)
            .bind(book.id)
            .bind(BorrowStatus::Borrowed.as_str())
            .bind(&now)
            .bind(actor)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM carts WHERE user_id = ? AND book_id = ?")
                .bind(user.id)
                .bind(book.id)
                .execute(&mut *tx)
                .await?;

            borrows.push(Borrow {
                id: result.last_insert_rowid(),
                status: BorrowStatus::Borrowed,
                user: BorrowUser {
                    id: user.id,
                    name: user.name.clone(),
                    email: user.email.clone(),
                },
                book: Book {
                    quantity: new_quantity,
                    status: new_status,
                    updated_at: Some(now.clone()),
                    ..book
                },
                created_at: Some(now.clone()),
                updated_at: None,
                created_by: Some(actor.to_string()),
                updated_by: None,
            });
        }

        tx.commit().await?;
        Ok(borrows)
    }

    /// Mark a borrow RETURNED and put the copy back in stock.
    pub async fn return_book(&self, borrow_id: i64, actor: &str) -> Result<Borrow, AppError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool().begin().await?;

        let row = sqlx::query(&format!(
            r#"SELECT {BORROW_COLUMNS} FROM borrows bw
               JOIN users u ON u.id = bw.user_id
               JOIN books b ON b.id = bw.book_id
               WHERE bw.id = ?"#
        ))
        .bind(borrow_id)
        .fetch_optional(&mut *tx)
        .await?;

        let borrow = row.as_ref().map(borrow_from_row).ok_or_else(|| {
            AppError::NotFound(format!("Borrow with id {} does not exist", borrow_id))
        })?;

        if borrow.status != BorrowStatus::Borrowed {
            return Err(AppError::Validation(format!(
                "Borrow with id {} is not outstanding",
                borrow_id
            )));
        }

        sqlx::query("UPDATE borrows SET status = ?, updated_at = ?, updated_by = ? WHERE id = ?")
            .bind(BorrowStatus::Returned.as_str())
            .bind(&now)
            .bind(actor)
            .bind(borrow_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "UPDATE books SET quantity = quantity + 1, status = ?, updated_at = ?, updated_by = ? WHERE id = ?",
        )
        .bind(BookStatus::Available.as_str())
        .bind(&now)
        .bind(actor)
        .bind(borrow.book.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let Borrow {
            id,
            user,
            book,
            created_at,
            created_by,
            ..
        } = borrow;
        Ok(Borrow {
            id,
            status: BorrowStatus::Returned,
            user,
            book: Book {
                quantity: book.quantity + 1,
                status: BookStatus::Available,
                updated_at: Some(now.clone()),
                ..book
            },
            created_at,
            updated_at: Some(now),
            created_by,
            updated_by: Some(actor.to_string()),
        })
    }

    /// Does the member currently have this exact book out?
    pub async fn find_active_borrow(
        &self,
        user_id: i64,
        book_id: i64,
    ) -> Result<Option<Borrow>, AppError> {
        let row = sqlx::query(&format!(
            r#"SELECT {BORROW_COLUMNS} FROM borrows bw
               JOIN users u ON u.id = bw.user_id
               JOIN books b ON b.id = bw.book_id
               WHERE bw.user_id = ? AND bw.book_id = ? AND bw.status = ?"#
        ))
        .bind(user_id)
        .bind(book_id)
        .bind(BorrowStatus::Borrowed.as_str())
        .fetch_optional(self.pool())
        .await?;

        Ok(row.as_ref().map(borrow_from_row))
    }

    /// All of a member's borrows in a given state.
    pub async fn borrows_by_user_and_status(
        &self,
        user_id: i64,
        status: BorrowStatus,
    ) -> Result<Vec<Borrow>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {BORROW_COLUMNS} FROM borrows bw
               JOIN users u ON u.id = bw.user_id
               JOIN books b ON b.id = bw.book_id
               WHERE bw.user_id = ? AND bw.status = ?
               ORDER BY bw.id"#
        ))
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(borrow_from_row).collect())
    }

    /// Paginated borrow history of a member, most recent first.
    pub async fn borrow_history(
        &self,
        user_id: i64,
        page: &PageQuery,
    ) -> Result<(Vec<Borrow>, i64), AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {BORROW_COLUMNS} FROM borrows bw
               JOIN users u ON u.id = bw.user_id
               JOIN books b ON b.id = bw.book_id
               WHERE bw.user_id = ?
               ORDER BY bw.id DESC
               LIMIT ? OFFSET ?"#
        ))
        .bind(user_id)
        .bind(page.page_size() as i64)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let row = sqlx::query("SELECT COUNT(*) AS n FROM borrows WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(self.pool())
            .await?;

        Ok((rows.iter().map(borrow_from_row).collect(), row.get("n")))
    }
}

fn borrow_from_row(row: &sqlx::sqlite::SqliteRow) -> Borrow {
    let status: String = row.get("bw_status");
    Borrow {
        id: row.get("bw_id"),
        status: BorrowStatus::parse(&status),
        user: BorrowUser {
            id: row.get("u_id"),
            name: row.get("u_name"),
            email: row.get("u_email"),
        },
        book: book_from_row(row),
        created_at: row.get("bw_created_at"),
        updated_at: row.get("bw_updated_at"),
        created_by: row.get("bw_created_by"),
        updated_by: row.get("bw_updated_by"),
    }
}
