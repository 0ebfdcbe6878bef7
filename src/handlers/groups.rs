use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppResult, ErrorBody},
    media::UploadForm,
    models::{
        GroupChanges, GroupMembershipView, GroupSearchQuery, GroupView, JoinResponse, MemberView,
        MessageResponse, NewGroup, Pagination,
    },
    service::groups,
};

/// create_group
///
/// [Authenticated Route] Multipart fields `name`, `description`, `public` and an optional
/// `avatar` file. The caller becomes the group's admin.
#[utoipa::path(
    post,
    path = "/group",
    responses(
        (status = 201, description = "Created", body = GroupView),
        (status = 409, description = "Group already exists", body = ErrorBody)
    )
)]
pub async fn create_group(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<GroupView>)> {
    let mut form = UploadForm::read(multipart).await?;
    let new_group = NewGroup {
        name: form.required("name")?,
        description: form.text("description").unwrap_or_default(),
        public: form.flag("public")?.unwrap_or(true),
        avatar: form.take_file("avatar"),
    };

    let group = groups::create(state.repo.as_ref(), &auth, new_group).await?;
    Ok((StatusCode::CREATED, Json(GroupView::from(group))))
}

/// list_groups
///
/// [Authenticated Route] Every group, paginated with `limit` (max 500) and `offset`.
#[utoipa::path(
    get,
    path = "/group/all",
    params(Pagination),
    responses((status = 200, description = "Groups", body = [GroupView]))
)]
pub async fn list_groups(
    _auth: AuthUser,
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<GroupView>>> {
    let all = groups::list(state.repo.as_ref(), page.limit, page.offset).await?;
    Ok(Json(all.into_iter().map(GroupView::from).collect()))
}

/// my_groups
///
/// [Authenticated Route] Groups the caller belongs to, with the caller's role in each.
#[utoipa::path(
    get,
    path = "/group/mygroups",
    responses((status = 200, description = "My groups", body = [GroupMembershipView]))
)]
pub async fn my_groups(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<GroupMembershipView>>> {
    Ok(Json(groups::my_groups(state.repo.as_ref(), &auth).await?))
}

#[utoipa::path(
    get,
    path = "/group/search",
    params(GroupSearchQuery),
    responses((status = 200, description = "Matching groups", body = [GroupMembershipView]))
)]
pub async fn search_groups(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<GroupSearchQuery>,
) -> AppResult<Json<Vec<GroupMembershipView>>> {
    Ok(Json(
        groups::search(state.repo.as_ref(), &auth, &query.name).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/group/name/{name}",
    params(("name" = String, Path, description = "Exact group name")),
    responses(
        (status = 200, description = "Found", body = GroupView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_group_by_name(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<GroupView>> {
    let group = groups::get_by_name(state.repo.as_ref(), &name).await?;
    Ok(Json(GroupView::from(group)))
}

#[utoipa::path(
    get,
    path = "/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Found", body = GroupView),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_group(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GroupView>> {
    let group = groups::get(state.repo.as_ref(), id).await?;
    Ok(Json(GroupView::from(group)))
}

/// update_group
///
/// [Authenticated Route] Multipart update; only group admins may change a group.
#[utoipa::path(
    put,
    path = "/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Updated", body = GroupView),
        (status = 403, description = "Not a group admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn update_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<GroupView>> {
    let mut form = UploadForm::read(multipart).await?;
    let changes = GroupChanges {
        name: form.text("name"),
        description: form.text("description"),
        public: form.flag("public")?,
        avatar: form.take_file("avatar"),
    };

    let group = groups::update(state.repo.as_ref(), &auth, id, changes).await?;
    Ok(Json(GroupView::from(group)))
}

/// delete_group
///
/// [Authenticated Route] Group admins only. Removes all posts, comments, reactions and
/// memberships of the group.
#[utoipa::path(
    delete,
    path = "/group/{id}",
    params(("id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not a group admin", body = ErrorBody)
    )
)]
pub async fn delete_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    groups::delete(state.repo.as_ref(), &auth, id).await?;
    Ok(Json(MessageResponse::new("Group deleted")))
}

/// join_group
///
/// [Authenticated Route] The caller joins the group. Idempotent.
#[utoipa::path(
    post,
    path = "/group/join/{group_id}",
    params(("group_id" = Uuid, Path, description = "Group ID")),
    responses((status = 200, description = "Joined or already a member", body = JoinResponse))
)]
pub async fn join_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<JoinResponse>> {
    let user_id = auth.id;
    Ok(Json(
        groups::join(state.repo.as_ref(), &auth, group_id, user_id).await?,
    ))
}

/// add_member
///
/// [Authenticated Route] Adds `user_id` to the group. Allowed to that user and to admins.
#[utoipa::path(
    post,
    path = "/group/join/{group_id}/{user_id}",
    params(
        ("group_id" = Uuid, Path, description = "Group ID"),
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "Joined or already a member", body = JoinResponse),
        (status = 403, description = "Not self or admin", body = ErrorBody)
    )
)]
pub async fn add_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((group_id, user_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<JoinResponse>> {
    Ok(Json(
        groups::join(state.repo.as_ref(), &auth, group_id, user_id).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/group/leave/{group_id}",
    params(("group_id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Left the group", body = MessageResponse),
        (status = 404, description = "Group or membership not found", body = ErrorBody)
    )
)]
pub async fn leave_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    groups::leave(state.repo.as_ref(), &auth, group_id).await?;
    Ok(Json(MessageResponse::new("Left the group")))
}

#[utoipa::path(
    get,
    path = "/group/members/{group_id}",
    params(("group_id" = Uuid, Path, description = "Group ID")),
    responses((status = 200, description = "Members", body = [MemberView]))
)]
pub async fn group_members(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<Vec<MemberView>>> {
    Ok(Json(groups::members(state.repo.as_ref(), group_id).await?))
}
