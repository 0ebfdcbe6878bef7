use axum::{
    Form, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppResult, ErrorBody},
    media::UploadForm,
    models::{LoginForm, LoginResponse, MessageResponse, RegisterRequest, UserUpdate, UserView},
    service::users,
};

/// register
///
/// [Public Route] Creates a new account with the default `user` role.
#[utoipa::path(
    post,
    path = "/user/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = UserView),
        (status = 409, description = "Username or email taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserView>)> {
    let user = users::register(state.repo.as_ref(), payload).await?;
    Ok((StatusCode::CREATED, Json(UserView::from(user))))
}

/// login
///
/// [Public Route] Exchanges form-encoded credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/user/login",
    request_body(content = LoginForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Invalid user or password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Json<LoginResponse>> {
    let response = users::login(state.repo.as_ref(), &state.config, form).await?;
    Ok(Json(response))
}

/// get_me
///
/// [Authenticated Route] The caller's own account.
#[utoipa::path(
    get,
    path = "/user/me",
    responses((status = 200, description = "Current user", body = UserView))
)]
pub async fn get_me(auth: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserView>> {
    let user = users::me(state.repo.as_ref(), &auth).await?;
    Ok(Json(UserView::from(user)))
}

/// get_user
///
/// [Authenticated Route] A single account. Allowed to the account owner and admins.
#[utoipa::path(
    get,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Found", body = UserView),
        (status = 403, description = "Not self or admin", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<UserView>> {
    let user = users::get(state.repo.as_ref(), &auth, id).await?;
    Ok(Json(UserView::from(user)))
}

/// update_user
///
/// [Authenticated Route] Multipart update of `email`, `password` and the `avatar` file.
/// Omitted parts are left unchanged.
#[utoipa::path(
    put,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Updated", body = UserView),
        (status = 409, description = "Email in use", body = ErrorBody)
    )
)]
pub async fn update_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<UserView>> {
    let mut form = UploadForm::read(multipart).await?;
    let update = UserUpdate {
        email: form.text("email"),
        password: form.text("password"),
        avatar: form.take_file("avatar"),
    };

    let user = users::update(state.repo.as_ref(), &auth, id, update).await?;
    Ok(Json(UserView::from(user)))
}

/// delete_user
///
/// [Authenticated Route] Deletes the account and all content it authored.
#[utoipa::path(
    delete,
    path = "/user/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted", body = MessageResponse),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_user(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    users::delete(state.repo.as_ref(), &auth, id).await?;
    Ok(Json(MessageResponse::new("User deleted")))
}
