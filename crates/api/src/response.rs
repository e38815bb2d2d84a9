//! Response bodies shared by the CWV handlers.
//!
//! Success and failure both carry a `success` flag so beacon senders and
//! dashboards can branch on one field.

use serde::Serialize;

/// `{ "success": true, "processed": n }` -- reply to an accepted batch.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub processed: u64,
}

impl IngestResponse {
    pub fn processed(processed: u64) -> Self {
        Self {
            success: true,
            processed,
        }
    }
}

/// `{ "success": false, "message": ..., "code": ... }` -- every error reply.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: &'static str,
}
