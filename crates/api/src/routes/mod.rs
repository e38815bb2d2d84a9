pub mod cwv;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /cwv                                             ingest a batch (POST, public)
/// /cwv/status/{page_id}                            page aggregate (GET, editor+)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/cwv", cwv::router())
}
