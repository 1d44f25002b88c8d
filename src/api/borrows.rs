//! Cart and borrowing endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{created, ok, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    AddToCartRequest, Borrow, BorrowStatus, Cart, CheckoutRequest, PageQuery, Paginated,
    ReturnBookRequest,
};
use crate::AppState;

const ALREADY_BORROWED: &str =
    "Sorry, you have to return the book is borrowed before you borrow the other one.";

/// POST /api/v1/add-to-cart - Put a book into the caller's cart.
///
/// Enforces the lending rules up front: a member may not queue a book they
/// still have out, nor a second book of a category they are borrowing from.
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<AddToCartRequest>,
) -> ApiResult<Cart> {
    let book = state
        .repo
        .get_active_book(request.book_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", request.book_id)))?;

    if state
        .repo
        .find_active_borrow(current.id, book.id)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(ALREADY_BORROWED.to_string()));
    }

    let borrowed = state
        .repo
        .borrows_by_user_and_status(current.id, BorrowStatus::Borrowed)
        .await?;
    if borrowed.iter().any(|b| b.book.category == book.category) {
        return Err(AppError::Validation(ALREADY_BORROWED.to_string()));
    }

    let cart = state.repo.add_to_cart(current.id, book.id).await?;
    created("Add to cart", cart)
}

/// GET /api/v1/carts - The caller's cart contents.
pub async fn list_carts(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> ApiResult<Vec<Cart>> {
    let carts = state.repo.carts_by_user(current.id).await?;
    ok("Get carts", carts)
}

/// DELETE /api/v1/carts/{id} - Remove one of the caller's cart entries.
pub async fn delete_cart(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    state.repo.delete_cart(id, current.id).await?;
    ok("Delete cart", ())
}

/// POST /api/v1/borrow - Check out a set of books for a member.
pub async fn borrow_books(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CheckoutRequest>,
) -> ApiResult<Vec<Borrow>> {
    if request.details.is_empty() {
        return Err(AppError::Validation(
            "Nothing to borrow, the request has no books".to_string(),
        ));
    }

    let user = state
        .repo
        .find_user_by_email(&request.username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", request.username)))?;

    let borrows = state
        .repo
        .checkout(&user, &request.details, &current.email)
        .await?;
    created("Borrow books", borrows)
}

/// PUT /api/v1/return-book - Return one borrowed copy.
pub async fn return_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<ReturnBookRequest>,
) -> ApiResult<Borrow> {
    let borrow = state
        .repo
        .return_book(request.borrow_id, &current.email)
        .await?;
    ok("Return book", borrow)
}

/// GET /api/v1/borrow-history - The caller's borrow records, newest first.
pub async fn borrow_history(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Paginated<Borrow>> {
    let (borrows, total) = state.repo.borrow_history(current.id, &page).await?;
    ok(
        "Get borrow history",
        Paginated::new(page.page(), page.page_size(), total, borrows),
    )
}
