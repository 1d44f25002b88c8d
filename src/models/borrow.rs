//! Borrow records and checkout requests.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Book;

/// Lifecycle of a borrow record.
///
/// Unknown or empty input falls back to `Borrowed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorrowStatus {
    Borrowed,
    Returned,
    Late,
    Lost,
}

impl BorrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "BORROWED",
            BorrowStatus::Returned => "RETURNED",
            BorrowStatus::Late => "LATE",
            BorrowStatus::Lost => "LOST",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "RETURNED" => BorrowStatus::Returned,
            "LATE" => BorrowStatus::Late,
            "LOST" => BorrowStatus::Lost,
            _ => BorrowStatus::Borrowed,
        }
    }
}

impl Default for BorrowStatus {
    fn default() -> Self {
        BorrowStatus::Borrowed
    }
}

impl Serialize for BorrowStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BorrowStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = Option::<String>::deserialize(deserializer)?;
        Ok(s.as_deref().map(BorrowStatus::parse).unwrap_or_default())
    }
}

/// The borrower as embedded in borrow payloads.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowUser {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// One borrowed copy of a book.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Borrow {
    pub id: i64,
    pub status: BorrowStatus,
    pub user: BorrowUser,
    pub book: Book,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

/// One line of a checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowDetail {
    pub book_id: i64,
}

/// Request body for checking out the cart.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub username: String,
    pub details: Vec<BorrowDetail>,
}

/// Request body for returning a borrowed book.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnBookRequest {
    pub borrow_id: i64,
}
