//! Well-known role name constants and capability checks.
//!
//! Role names are carried in the `role` claim of access tokens issued by
//! the host CMS.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_EDITOR: &str = "editor";
pub const ROLE_AUTHOR: &str = "author";
pub const ROLE_SUBSCRIBER: &str = "subscriber";

/// Whether a role may read aggregated CWV status (editor level or higher).
pub fn can_view_status(role: &str) -> bool {
    matches!(role, ROLE_ADMIN | ROLE_EDITOR)
}
