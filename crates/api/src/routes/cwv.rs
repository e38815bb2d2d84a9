//! Route definitions for Core Web Vitals ingestion and status.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::cwv;
use crate::state::AppState;

/// CWV routes mounted at `/cwv`.
///
/// ```text
/// POST /                       -> receive_metrics (public)
/// GET  /status/{page_id}       -> get_status (editor or admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(cwv::receive_metrics))
        .route("/status/{page_id}", get(cwv::get_status))
}
