//! Book catalog endpoints.
//!
//! Public routes only see active books; admin routes see everything and every
//! mutation is written to the activity log.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{created, ok, record_activity, ApiResult};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    ActivityDescription, ActivityGroup, ActivityType, Book, BookFilter, BulkCreateBooksRequest,
    BulkCreateResponse, CreateBookRequest, NewActivityLog, PageQuery, Paginated, UpdateBookRequest,
};
use crate::AppState;

/// GET /api/v1/books - Public paginated listing of active books.
pub async fn list_books(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<BookFilter>,
) -> ApiResult<Paginated<Book>> {
    let (books, total) = state.repo.list_books(&filter, &page, true).await?;
    ok(
        "Get books",
        Paginated::new(page.page(), page.page_size(), total, books),
    )
}

/// GET /api/v1/books/{id} - Public book detail. Soft-deleted books 404.
pub async fn get_book(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Book> {
    let book = state
        .repo
        .get_active_book(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
    ok("Get book", book)
}

/// GET /api/v1/admin/books - Admin listing including soft-deleted books.
pub async fn list_books_admin(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<BookFilter>,
) -> ApiResult<Paginated<Book>> {
    let (books, total) = state.repo.list_books(&filter, &page, false).await?;
    ok(
        "Get books",
        Paginated::new(page.page(), page.page_size(), total, books),
    )
}

/// POST /api/v1/admin/books - Create a book.
pub async fn create_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<CreateBookRequest>,
) -> ApiResult<Book> {
    validate_new_book(&request)?;

    let book = state.repo.create_book(&request, &current.email).await?;

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::Book,
            ActivityType::CreateBook,
            vec![
                ActivityDescription::from("id", book.id, "Book id"),
                ActivityDescription::from("title", &book.title, "Title"),
            ],
            &current.email,
        ),
    )
    .await;

    created("Create book", book)
}

/// PUT /api/v1/admin/books/{id} - Update a book.
pub async fn update_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateBookRequest>,
) -> ApiResult<Book> {
    if let Some(quantity) = request.quantity {
        if quantity < 0 {
            return Err(AppError::Validation(
                "Quantity cannot be negative".to_string(),
            ));
        }
    }

    let before = state
        .repo
        .get_book(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
    let book = state.repo.update_book(id, &request, &current.email).await?;

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::Book,
            ActivityType::UpdateBook,
            book_changes(&before, &book),
            &current.email,
        ),
    )
    .await;

    ok("Update book", book)
}

/// DELETE /api/v1/admin/books/{id} - Permanently delete a book.
pub async fn delete_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let book = state
        .repo
        .get_book(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book {} not found", id)))?;
    state.repo.delete_book(id).await?;

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::Book,
            ActivityType::DeleteBook,
            vec![
                ActivityDescription::from("id", book.id, "Book id"),
                ActivityDescription::from("title", &book.title, "Title"),
            ],
            &current.email,
        ),
    )
    .await;

    ok("Delete book", ())
}

/// PATCH /api/v1/admin/books/{id} - Toggle the soft-delete flag.
pub async fn toggle_book(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Book> {
    let book = state.repo.toggle_book_active(id, &current.email).await?;

    record_activity(
        &state,
        NewActivityLog::new(
            ActivityGroup::Book,
            ActivityType::SoftDeleteBook,
            vec![
                ActivityDescription::from("id", book.id, "Book id"),
                ActivityDescription::from("active", book.active, "Active"),
            ],
            &current.email,
        ),
    )
    .await;

    ok("Toggle soft delete book", book)
}

/// POST /api/v1/admin/books/bulk - Create many books, collecting per-item errors.
pub async fn bulk_create_books(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(request): Json<BulkCreateBooksRequest>,
) -> ApiResult<BulkCreateResponse> {
    let mut success_count = 0u64;
    let mut errors = Vec::new();

    for (index, item) in request.books.iter().enumerate() {
        let result = match validate_new_book(item) {
            Ok(()) => state.repo.create_book(item, &current.email).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => success_count += 1,
            Err(e) => errors.push(format!("Row {}: {}", index + 1, e.message())),
        }
    }

    let response = BulkCreateResponse {
        success_count,
        error_count: errors.len() as u64,
        errors,
    };
    ok("Bulk create books", response)
}

fn validate_new_book(request: &CreateBookRequest) -> Result<(), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if request.category.trim().is_empty() {
        return Err(AppError::Validation("Category is required".to_string()));
    }
    if request.quantity < 0 {
        return Err(AppError::Validation(
            "Quantity cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Field-level diff for the update audit entry.
fn book_changes(before: &Book, after: &Book) -> Vec<ActivityDescription> {
    let mut changes = vec![ActivityDescription::from("id", after.id, "Book id")];
    if before.title != after.title {
        changes.push(ActivityDescription::from(
            "title",
            format!("{} -> {}", before.title, after.title),
            "Title",
        ));
    }
    if before.category != after.category {
        changes.push(ActivityDescription::from(
            "category",
            format!("{} -> {}", before.category, after.category),
            "Category",
        ));
    }
    if before.quantity != after.quantity {
        changes.push(ActivityDescription::from(
            "quantity",
            format!("{} -> {}", before.quantity, after.quantity),
            "Quantity",
        ));
    }
    if before.status != after.status {
        changes.push(ActivityDescription::from(
            "status",
            format!("{} -> {}", before.status.as_str(), after.status.as_str()),
            "Status",
        ));
    }
    changes
}
