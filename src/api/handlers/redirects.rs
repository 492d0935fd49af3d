//! Handlers for redirect registry endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use crate::api::dto::redirects::{
    BatchRequest, BatchResponse, CreateRedirectRequest, ListRedirectsParams, PurgeResponse,
    RedirectListResponse, UpdateRedirectRequest,
};
use crate::domain::entities::RedirectEntry;
use crate::error::AppError;
use crate::state::AppState;

/// Lists redirect entries with filtering, ordering and paging.
///
/// # Endpoint
///
/// `GET /api/redirects`
///
/// # Query Parameters
///
/// - `search` - `id:<n>` for an exact id, otherwise a substring where spaces act
///   as wildcards (matched against source, destination, comment and referer)
/// - `state` - `0` disabled, `1` enabled, `2` archived; empty for all
/// - `ordering` - `id`, `old_url`, `new_url`, `referer`, `hits`, `created_date`
///   or `published` (default `old_url`)
/// - `direction` - `asc` or `desc` (default `asc`)
/// - `page`, `page_size` - 1-based page, 1 to 1000 entries (default 25)
///
/// # Errors
///
/// Returns 400 Bad Request for an unknown state, ordering or direction.
pub async fn list_redirects_handler(
    State(state): State<AppState>,
    Query(params): Query<ListRedirectsParams>,
) -> Result<Json<RedirectListResponse>, AppError> {
    let query = params.into_query()?;
    let page = state.redirect_service.list(&query).await?;

    Ok(Json(page.into()))
}

/// Ingests a batch of redirects.
///
/// # Endpoint
///
/// `POST /api/redirects/batch`
///
/// # Request Body
///
/// ```json
/// {
///   "pairs": [
///     { "old_url": "/old-page", "new_url": "https://example.com/new" },
///     { "old_url": "/gone" }
///   ]
/// }
/// ```
///
/// Duplicates (within the batch or already stored) are not an error; they are
/// listed in `rejected` as normalized source URLs, in request order.
///
/// # Errors
///
/// Returns 400 Bad Request when a source URL is blank, 503 when the store
/// fails. The 503 body still carries `details.rejected`.
pub async fn batch_handler(
    State(state): State<AppState>,
    Json(payload): Json<BatchRequest>,
) -> Response {
    if let Err(e) = payload.validate() {
        return AppError::from(e).into_response();
    }

    let total = payload.pairs.len();
    match state.redirect_service.ingest(payload.into_pairs()).await {
        Ok(report) => Json(BatchResponse::new(total, report)).into_response(),
        Err(failure) => failure.into_response(),
    }
}

/// Creates a single redirect.
///
/// # Endpoint
///
/// `POST /api/redirects`
///
/// # Errors
///
/// Returns 409 Conflict if the normalized source URL already exists.
pub async fn create_redirect_handler(
    State(state): State<AppState>,
    Json(payload): Json<CreateRedirectRequest>,
) -> Result<(StatusCode, Json<RedirectEntry>), AppError> {
    payload.validate()?;

    let entry = state.redirect_service.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// `GET /api/redirects/{id}`
pub async fn get_redirect_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<RedirectEntry>, AppError> {
    Ok(Json(state.redirect_service.get(id).await?))
}

/// Partially updates a redirect.
///
/// # Endpoint
///
/// `PATCH /api/redirects/{id}`
///
/// # Request Body
///
/// ```json
/// {
///   "new_url": "https://example.com/moved",
///   "published": 1,
///   "comment": null
/// }
/// ```
///
/// # Errors
///
/// Returns 404 Not Found if the entry doesn't exist.
pub async fn update_redirect_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateRedirectRequest>,
) -> Result<Json<RedirectEntry>, AppError> {
    payload.validate()?;

    let entry = state.redirect_service.update(id, payload.into()).await?;
    Ok(Json(entry))
}

/// `DELETE /api/redirects/{id}`
///
/// # Errors
///
/// Returns 404 Not Found if the entry doesn't exist.
pub async fn delete_redirect_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.redirect_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Records one hit on a redirect.
///
/// # Endpoint
///
/// `POST /api/redirects/{id}/hits`
pub async fn record_hit_handler(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    state.redirect_service.record_hit(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Deletes every disabled redirect.
///
/// # Endpoint
///
/// `POST /api/redirects/purge`
///
/// # Errors
///
/// Returns 503 if the store fails; no entry is removed in that case.
pub async fn purge_handler(
    State(state): State<AppState>,
) -> Result<Json<PurgeResponse>, AppError> {
    let removed = state.redirect_service.purge().await?;
    Ok(Json(PurgeResponse { removed }))
}
