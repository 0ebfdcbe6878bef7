use crate::{
    AppState,
    handlers::{groups, posts, users},
};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the `auth_middleware` layer applied in `create_router`, so
/// handlers always receive a validated `AuthUser`. Ownership, membership and group-admin
/// checks happen in the service layer.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Users ---
        .route("/user/me", get(users::get_me))
        // GET/PUT/DELETE /user/{id}
        // Self or global admin only.
        .route(
            "/user/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // --- Groups ---
        .route("/group", post(groups::create_group))
        .route("/group/all", get(groups::list_groups))
        .route("/group/mygroups", get(groups::my_groups))
        .route("/group/search", get(groups::search_groups))
        .route("/group/name/{name}", get(groups::get_group_by_name))
        // PUT/DELETE require an admin membership in the group.
        .route(
            "/group/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .route("/group/join/{group_id}", post(groups::join_group))
        .route("/group/join/{group_id}/{user_id}", post(groups::add_member))
        .route("/group/leave/{group_id}", post(groups::leave_group))
        .route("/group/members/{group_id}", get(groups::group_members))
        // --- Posts, Comments & Reactions ---
        .route("/posts", post(posts::create_post))
        .route("/posts/user/{user_id}", get(posts::posts_by_user))
        .route("/posts/group/{group_id}", get(posts::posts_by_group))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::edit_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/comment", post(posts::add_comment))
        .route("/posts/comment/{id}", delete(posts::delete_comment))
        // POST toggles: the same type twice removes the reaction.
        .route("/posts/{id}/reaction", post(posts::react_to_post))
        .route(
            "/posts/comment/{id}/reaction",
            post(posts::react_to_comment),
        )
        .route("/posts/reaction/{id}", delete(posts::delete_reaction))
}
