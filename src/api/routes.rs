//! API route configuration.

use crate::api::handlers::{
    batch_handler, create_redirect_handler, delete_redirect_handler, get_redirect_handler,
    list_redirects_handler, purge_handler, record_hit_handler, update_redirect_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Redirect registry routes, mounted under `/api`.
///
/// # Endpoints
///
/// - `GET    /redirects`            - Filtered, ordered, paginated listing
/// - `POST   /redirects`            - Create one redirect
/// - `POST   /redirects/batch`      - Ingest a batch with duplicate detection
/// - `POST   /redirects/purge`      - Delete every disabled redirect
/// - `GET    /redirects/{id}`       - Fetch one redirect
/// - `PATCH  /redirects/{id}`       - Partially update a redirect
/// - `DELETE /redirects/{id}`       - Delete a redirect
/// - `POST   /redirects/{id}/hits`  - Count one hit
pub fn redirect_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/redirects",
            get(list_redirects_handler).post(create_redirect_handler),
        )
        .route("/redirects/batch", post(batch_handler))
        .route("/redirects/purge", post(purge_handler))
        .route(
            "/redirects/{id}",
            get(get_redirect_handler)
                .patch(update_redirect_handler)
                .delete(delete_redirect_handler),
        )
        .route("/redirects/{id}/hits", post(record_hit_handler))
}
