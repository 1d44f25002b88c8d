//! Book repository operations.

use chrono::Utc;
use sqlx::Row;

use super::Repository;
use crate::errors::AppError;
use crate::models::{
    Book, BookFilter, BookStatus, CreateBookRequest, PageQuery, UpdateBookRequest,
};

impl Repository {
    /// Get a book by id regardless of active flag.
    pub async fn get_book(&self, id: i64) -> Result<Option<Book>, AppError> {
        let row = sqlx::query("SELECT * FROM books WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(book_from_row))
    }

    /// Get an active (not soft-deleted) book by id.
    pub async fn get_active_book(&self, id: i64) -> Result<Option<Book>, AppError> {
        let row = sqlx::query("SELECT * FROM books WHERE id = ? AND active = 1")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.as_ref().map(book_from_row))
    }

    /// Create a new book, active by default.
    pub async fn create_book(
        &self,
        request: &CreateBookRequest,
        actor: &str,
    ) -> Result<Book, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            r#"INSERT INTO books
                (category, title, author, publisher, thumb, description, quantity, status,
                 active, created_at, created_by)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)"#,
        )
        .bind(&request.category)
        .bind(&request.title)
        .bind(&request.author)
        .bind(&request.publisher)
        .bind(&request.thumb)
        .bind(&request.description)
        .bind(request.quantity)
        .bind(request.status.as_str())
        .bind(&now)
        .bind(actor)
        .execute(self.pool())
        .await?;

        let id = result.last_insert_rowid();
        self.get_book(id)
            .await?
            .ok_or_else(|| AppError::Internal("Book vanished after insert".to_string()))
    }

    /// Update a book's catalog fields.
    pub async fn update_book(
        &self,
        id: i64,
        request: &UpdateBookRequest,
        actor: &str,
    ) -> Result<Book, AppError> {
        let existing = self
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} does not exist", id)))?;

        let category = request.category.as_ref().unwrap_or(&existing.category);
        let title = request.title.as_ref().unwrap_or(&existing.title);
        let author = request.author.as_ref().unwrap_or(&existing.author);
        let publisher = request.publisher.as_ref().unwrap_or(&existing.publisher);
        let thumb = request.thumb.clone().or(existing.thumb.clone());
        let description = request.description.clone().or(existing.description.clone());
        let quantity = request.quantity.unwrap_or(existing.quantity);
        let status = request.status.unwrap_or(existing.status);
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"UPDATE books SET category = ?, title = ?, author = ?, publisher = ?, thumb = ?,
               description = ?, quantity = ?, status = ?, updated_at = ?, updated_by = ?
               WHERE id = ?"#,
        )
        .bind(category)
        .bind(title)
        .bind(author)
        .bind(publisher)
        .bind(&thumb)
        .bind(&description)
        .bind(quantity)
        .bind(status.as_str())
        .bind(&now)
        .bind(actor)
        .bind(id)
        .execute(self.pool())
        .await?;

        self.get_book(id)
            .await?
            .ok_or_else(|| AppError::Internal("Book vanished after update".to_string()))
    }

    /// Hard-delete a book.
    pub async fn delete_book(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Book with id {} does not exist",
                id
            )));
        }
        Ok(())
    }

    /// Flip the soft-delete flag and return the updated book.
    pub async fn toggle_book_active(&self, id: i64, actor: &str) -> Result<Book, AppError> {
        let existing = self
            .get_book(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} does not exist", id)))?;
        let now = Utc::now().to_rfc3339();

        sqlx::query("UPDATE books SET active = ?, updated_at = ?, updated_by = ? WHERE id = ?")
            .bind(!existing.active as i32)
            .bind(&now)
            .bind(actor)
            .bind(id)
            .execute(self.pool())
            .await?;

        self.get_book(id)
            .await?
            .ok_or_else(|| AppError::Internal("Book vanished after update".to_string()))
    }

    /// List books with optional category/title substring filters.
    /// When `only_active` is set, soft-deleted books are hidden.
    pub async fn list_books(
        &self,
        filter: &BookFilter,
        page: &PageQuery,
        only_active: bool,
    ) -> Result<(Vec<Book>, i64), AppError> {
        let rows = sqlx::query(
            r#"SELECT * FROM books
               WHERE (?1 IS NULL OR category LIKE '%' || ?1 || '%')
                 AND (?2 IS NULL OR title LIKE '%' || ?2 || '%')
                 AND (?3 = 0 OR active = 1)
               ORDER BY title
               LIMIT ?4 OFFSET ?5"#,
        )
        .bind(&filter.category)
        .bind(&filter.title)
        .bind(only_active as i32)
        .bind(page.page_size() as i64)
        .bind(page.offset())
        .fetch_all(self.pool())
        .await?;

        let row = sqlx::query(
            r#"SELECT COUNT(*) AS n FROM books
               WHERE (?1 IS NULL OR category LIKE '%' || ?1 || '%')
                 AND (?2 IS NULL OR title LIKE '%' || ?2 || '%')
                 AND (?3 = 0 OR active = 1)"#,
        )
        .bind(&filter.category)
        .bind(&filter.title)
        .bind(only_active as i32)
        .fetch_one(self.pool())
        .await?;

        Ok((rows.iter().map(book_from_row).collect(), row.get("n")))
    }

    pub async fn count_books(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM books")
            .fetch_one(self.pool())
            .await?;
        Ok(row.get("n"))
    }
}

pub(crate) fn book_from_row(row: &sqlx::sqlite::SqliteRow) -> Book {
    let status: String = row.get("status");
    let active: i32 = row.get("active");
    Book {
        id: row.get("id"),
        category: row.get("category"),
        title: row.get("title"),
        author: row.get("author"),
        publisher: row.get("publisher"),
        thumb: row.get("thumb"),
        description: row.get("description"),
        quantity: row.get("quantity"),
        status: BookStatus::parse(&status),
        active: active != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        created_by: row.get("created_by"),
        updated_by: row.get("updated_by"),
    }
}
