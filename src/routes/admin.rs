use crate::{AppState, handlers::admin};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Handlers extract `AuthUser` themselves and the service layer
/// rejects callers without the global `admin` role with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users?username=&email=&role=&status=
        .route("/users", get(admin::list_users))
        // GET /admin/posts
        // Every post across all groups, newest first.
        .route("/posts", get(admin::list_posts))
}
