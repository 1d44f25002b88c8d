//! Member carts.

use serde::{Deserialize, Serialize};

use super::Book;

/// A book waiting to be checked out by a member.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: i64,
    pub sum: i64,
    pub user_id: i64,
    pub book: Book,
}

/// Request body for adding a book to the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub book_id: i64,
}
