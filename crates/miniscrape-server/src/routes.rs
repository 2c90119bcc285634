use std::sync::Arc;

use axum::Router;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{delete, get};
use tokio_util::sync::CancellationToken;

use crate::auth::require_admin_token;
use crate::dto::{CategoryResponse, ContentResponse, HealthResponse, selector_from_query};
use crate::error::ApiError;
use crate::state::AppState;

/// Build the full router with all routes and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    let admin = Router::new()
        .route("/api/v1/cache", delete(invalidate_cache))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_token,
        ));

    let public = Router::new()
        .route("/health", get(health))
        .route("/api/v1/categories", get(list_categories))
        .route("/api/v1/pages", get(list_pages))
        .route("/api/v1/content", get(content));

    public.merge(admin).with_state(state)
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

pub async fn content(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let selector = selector_from_query(query.as_deref());

    // Dropping the handler (client went away) cancels the pending pages.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let results = state.service.scrape(&cancel, &selector).await;
    guard.disarm();

    let response: Vec<ContentResponse> = results.into_iter().map(ContentResponse::from).collect();
    axum::Json(response)
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub async fn list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let categories = state.service.categories().await?;
    let response: Vec<CategoryResponse> =
        categories.iter().map(CategoryResponse::from).collect();
    Ok(axum::Json(response))
}

/// Full category definitions, pages included.
pub async fn list_pages(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let categories = state.service.categories().await?;
    Ok(axum::Json(categories.as_ref().clone()))
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

pub async fn invalidate_cache(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> impl IntoResponse {
    let selector = selector_from_query(query.as_deref());
    state.service.invalidate_cache(&selector).await;
    tracing::info!(
        category = %selector.category,
        page = %selector.page,
        "Cache invalidated"
    );
    StatusCode::NO_CONTENT
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse { status: "healthy" })
}
