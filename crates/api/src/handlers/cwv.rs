//! Handlers for Core Web Vitals ingestion and status.
//!
//! Ingestion is public so anonymous visitors can report. Status requires an
//! editor-level role.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use vitals_core::aggregate::PageCwvStatus;
use vitals_core::sample::Batch;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireEditor;
use crate::response::IngestResponse;
use crate::state::AppState;

/// POST /cwv
///
/// Accept a batch of metric samples from a page collector.
///
/// The body is parsed as JSON whatever the `Content-Type`, because beacon
/// senders commonly label string payloads `text/plain`. Validation is
/// all-or-nothing and the batch is persisted as one unit.
pub async fn receive_metrics(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<IngestResponse>> {
    let mut batch: Batch = serde_json::from_slice(&body).map_err(|e| {
        tracing::debug!(error = %e, bytes = body.len(), "Rejected unparseable CWV payload");
        AppError::BadRequest(format!("Invalid metrics payload: {e}"))
    })?;

    if let Err(e) = batch.validate(state.config.max_batch_size) {
        tracing::debug!(error = %e, samples = batch.metrics.len(), "Rejected invalid CWV batch");
        return Err(e.into());
    }

    batch.normalize();

    let processed = state.store.record_batch(&batch).await?;

    tracing::info!(
        processed,
        page_id = %batch.metrics[0].page_id,
        device = batch.metrics[0].device_type.as_str(),
        "CWV batch accepted",
    );

    Ok(Json(IngestResponse::processed(processed)))
}

/// GET /cwv/status/{page_id}
///
/// Aggregated status for one page. A page with no data gets an empty
/// aggregate rather than 404.
pub async fn get_status(
    State(state): State<AppState>,
    RequireEditor(user): RequireEditor,
    Path(page_id): Path<String>,
) -> AppResult<Json<PageCwvStatus>> {
    let status = state
        .store
        .page_status(&page_id)
        .await?
        .unwrap_or_else(|| PageCwvStatus::empty(page_id.as_str()));

    tracing::debug!(
        page_id = %page_id,
        user_id = %user.user_id,
        vitals = status.vitals.len(),
        "CWV status served",
    );

    Ok(Json(status))
}
