//! Admin dashboard and activity log endpoints.

use axum::extract::{Query, State};

use super::{ok, ApiResult};
use crate::db::{BookStats, DashboardStats};
use crate::models::{ActivityFilter, ActivityLog, PageQuery, Paginated};
use crate::AppState;

/// GET /api/v1/admin/activity-logs - Paginated audit trail, newest first.
pub async fn list_activity_logs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ActivityFilter>,
) -> ApiResult<Paginated<ActivityLog>> {
    let (logs, total) = state.repo.list_activity_logs(&filter, &page).await?;
    ok(
        "Get activity logs",
        Paginated::new(page.page(), page.page_size(), total, logs),
    )
}

/// GET /api/v1/admin/dashboard - Headline counts for the dashboard.
pub async fn dashboard(State(state): State<AppState>) -> ApiResult<DashboardStats> {
    let stats = state.repo.dashboard_stats().await?;
    ok("Get dashboard", stats)
}

/// GET /api/v1/admin/dashboard/books - Per-book stock and borrow counts.
pub async fn dashboard_books(State(state): State<AppState>) -> ApiResult<Vec<BookStats>> {
    let stats = state.repo.book_stats().await?;
    ok("Get dashboard books", stats)
}
