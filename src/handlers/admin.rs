use axum::{
    Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppResult, ErrorBody},
    models::{PostView, UserFilter, UserView},
    service::{content, users},
};

/// list_users
///
/// [Admin Route] The user directory, filtered by exact `username`, `email`, `role` or
/// `status`.
///
/// *Authorization*: the global `admin` role is checked in the service layer; any other
/// caller receives 403.
#[utoipa::path(
    get,
    path = "/admin/users",
    params(UserFilter),
    responses(
        (status = 200, description = "Users", body = [UserView]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_users(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<Vec<UserView>>> {
    let all = users::list(state.repo.as_ref(), &auth, &filter).await?;
    Ok(Json(all.into_iter().map(UserView::from).collect()))
}

/// list_posts
///
/// [Admin Route] Every post in every group, newest first.
#[utoipa::path(
    get,
    path = "/admin/posts",
    responses(
        (status = 200, description = "All posts", body = [PostView]),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_posts(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(content::list_all(state.repo.as_ref(), &auth).await?))
}
