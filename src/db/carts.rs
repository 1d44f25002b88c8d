//! Cart repository operations.

use sqlx::Row;

use super::books::book_from_row;
use super::Repository;
use crate::errors::AppError;
use crate::models::Cart;

const CART_COLUMNS: &str = r#"
    c.id AS cart_id, c.sum AS cart_sum, c.user_id AS cart_user_id,
    b.id, b.category, b.title, b.author, b.publisher, b.thumb, b.description,
    b.quantity, b.status, b.active, b.created_at, b.updated_at, b.created_by, b.updated_by
"#;

impl Repository {
    /// Put a book into a member's cart.
    pub async fn add_to_cart(&self, user_id: i64, book_id: i64) -> Result<Cart, AppError> {
        let result = sqlx::query("INSERT INTO carts (sum, user_id, book_id) VALUES (1, ?, ?)")
            .bind(user_id)
            .bind(book_id)
            .execute(self.pool())
            .await?;

        let id = result.last_insert_rowid();
        let row = sqlx::query(&format!(
            "SELECT {CART_COLUMNS} FROM carts c JOIN books b ON b.id = c.book_id WHERE c.id = ?"
        ))
        .bind(id)
        .fetch_one(self.pool())
        .await?;

        Ok(cart_from_row(&row))
    }

    /// All cart items of a member.
    pub async fn carts_by_user(&self, user_id: i64) -> Result<Vec<Cart>, AppError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {CART_COLUMNS} FROM carts c
               JOIN books b ON b.id = c.book_id
               WHERE c.user_id = ?
               ORDER BY c.id"#
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.iter().map(cart_from_row).collect())
    }

    /// Delete a member's cart item.
    pub async fn delete_cart(&self, id: i64, user_id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM carts WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Cart with id {} does not exist",
                id
            )));
        }
        Ok(())
    }
}

fn cart_from_row(row: &sqlx::sqlite::SqliteRow) -> Cart {
    Cart {
        id: row.get("cart_id"),
        sum: row.get("cart_sum"),
        user_id: row.get("cart_user_id"),
        book: book_from_row(row),
    }
}
