use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, AppResult, ErrorBody},
    media::UploadForm,
    models::{
        CommentRequest, CommentView, EditPostRequest, MessageResponse, NewPost, PostDetail,
        PostView, ReactionRequest, ReactionResponse, ReactionTarget,
    },
    service::content,
};

/// create_post
///
/// [Authenticated Route] Multipart fields `group_id`, `content` and an optional `image`
/// file. The caller must be a member of the group.
#[utoipa::path(
    post,
    path = "/posts",
    responses(
        (status = 201, description = "Created", body = PostView),
        (status = 403, description = "Not a member", body = ErrorBody)
    )
)]
pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<PostView>)> {
    let mut form = UploadForm::read(multipart).await?;
    let group_id = form
        .required("group_id")?
        .parse::<Uuid>()
        .map_err(|_| AppError::BadRequest("Field 'group_id' must be a UUID".to_string()))?;
    let new_post = NewPost {
        group_id,
        content: form.text("content").unwrap_or_default(),
        image: form.take_file("image"),
    };

    let post = content::create_post(state.repo.as_ref(), &auth, new_post).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

#[utoipa::path(
    get,
    path = "/posts/user/{user_id}",
    params(("user_id" = Uuid, Path, description = "Author ID")),
    responses((status = 200, description = "Posts, newest first", body = [PostView]))
)]
pub async fn posts_by_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(
        content::list_for_user(state.repo.as_ref(), &auth, user_id).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/posts/group/{group_id}",
    params(("group_id" = Uuid, Path, description = "Group ID")),
    responses(
        (status = 200, description = "Posts, newest first", body = [PostView]),
        (status = 403, description = "Not a member", body = ErrorBody)
    )
)]
pub async fn posts_by_group(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(group_id): Path<Uuid>,
) -> AppResult<Json<Vec<PostView>>> {
    Ok(Json(
        content::list_for_group(state.repo.as_ref(), &auth, group_id).await?,
    ))
}

/// get_post
///
/// [Authenticated Route] The post with its comments and reactions, each carrying an
/// author summary.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PostDetail>> {
    Ok(Json(content::get_detail(state.repo.as_ref(), &auth, id).await?))
}

#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = EditPostRequest,
    responses(
        (status = 200, description = "Updated", body = PostView),
        (status = 403, description = "Not the author", body = ErrorBody)
    )
)]
pub async fn edit_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EditPostRequest>,
) -> AppResult<Json<PostView>> {
    Ok(Json(
        content::edit_post(state.repo.as_ref(), &auth, id, &payload.content).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = Uuid, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the author", body = ErrorBody)
    )
)]
pub async fn delete_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    content::delete_post(state.repo.as_ref(), &auth, id).await?;
    Ok(Json(MessageResponse::new("Post deleted")))
}

#[utoipa::path(
    post,
    path = "/posts/{id}/comment",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment Added", body = CommentView),
        (status = 403, description = "Not a member", body = ErrorBody)
    )
)]
pub async fn add_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<Uuid>,
    Json(payload): Json<CommentRequest>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    let comment = content::comment(state.repo.as_ref(), &auth, post_id, &payload.text).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

#[utoipa::path(
    delete,
    path = "/posts/comment/{id}",
    params(("id" = Uuid, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the author", body = ErrorBody)
    )
)]
pub async fn delete_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    content::delete_comment(state.repo.as_ref(), &auth, id).await?;
    Ok(Json(MessageResponse::new("Comment deleted")))
}

/// react_to_post
///
/// [Authenticated Route] Toggles a reaction on a post. Sending the same type twice
/// removes it; "like" and "dislike" replace each other.
#[utoipa::path(
    post,
    path = "/posts/{id}/reaction",
    params(("id" = Uuid, Path, description = "Post ID")),
    request_body = ReactionRequest,
    responses((status = 200, description = "Added or removed", body = ReactionResponse))
)]
pub async fn react_to_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReactionRequest>,
) -> AppResult<Json<ReactionResponse>> {
    let target = ReactionTarget::Post(id);
    Ok(Json(
        content::react(state.repo.as_ref(), &auth, target, &payload.reaction_type).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/posts/comment/{id}/reaction",
    params(("id" = Uuid, Path, description = "Comment ID")),
    request_body = ReactionRequest,
    responses((status = 200, description = "Added or removed", body = ReactionResponse))
)]
pub async fn react_to_comment(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReactionRequest>,
) -> AppResult<Json<ReactionResponse>> {
    let target = ReactionTarget::Comment(id);
    Ok(Json(
        content::react(state.repo.as_ref(), &auth, target, &payload.reaction_type).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/posts/reaction/{id}",
    params(("id" = Uuid, Path, description = "Reaction ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 403, description = "Not the author", body = ErrorBody)
    )
)]
pub async fn delete_reaction(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    content::delete_reaction(state.repo.as_ref(), &auth, id).await?;
    Ok(Json(MessageResponse::new("Reaction deleted")))
}
