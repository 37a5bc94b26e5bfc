//! Status and report handlers.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::Uri,
    Json,
};
use std::sync::Arc;

use crate::store::Report;
use crate::web::dto::{ReportQuery, StatusResponse};
use crate::web::error::{ApiError, ApiResult};
use crate::web::handlers::AppState;

/// GET / - Service and collector status.
pub async fn status(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatusResponse>> {
    let counts = state.store.counts().await?;
    Ok(Json(StatusResponse::new(
        state.collector_state(),
        counts.posts,
        counts.tags,
    )))
}

/// GET /report - Recent posts for the given tags.
pub async fn report(
    State(state): State<Arc<AppState>>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Report>> {
    let Query(query) = query?;
    let tags = query.tag_names()?;
    let window = query.window(state.default_window)?;

    let posts = state.store.report(&tags, window).await?;
    tracing::debug!("Report for {:?}: {} post(s)", tags, posts.len());
    Ok(Json(Report::new(posts)))
}

/// Fallback for unknown paths.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
