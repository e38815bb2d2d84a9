//! Role-based access control (RBAC) extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects requests whose role does not
//! meet the minimum requirement, before the handler body runs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use vitals_core::error::CoreError;
use vitals_core::roles::can_view_status;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires an editor-level role (`editor` or `admin`). Rejects with 403 otherwise.
///
/// ```ignore
/// async fn status(RequireEditor(user): RequireEditor) -> AppResult<Json<()>> {
///     Ok(Json(()))
/// }
/// ```
pub struct RequireEditor(pub AuthUser);

impl FromRequestParts<AppState> for RequireEditor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !can_view_status(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Editor role required".into(),
            )));
        }
        Ok(RequireEditor(user))
    }
}
