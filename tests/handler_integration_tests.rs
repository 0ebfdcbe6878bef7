use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use social_hub::{
    AppConfig, AppError, AppState, MemoryRepository,
    auth::AuthUser,
    handlers::{admin, groups, posts, users},
    models::{
        AccountRole, CommentRequest, EditPostRequest, GroupSearchQuery, JoinOutcome, NewGroup,
        NewPost, Pagination, PostDetail, ReactionRequest, ReactionStatus, RegisterRequest,
        UserFilter,
    },
    service,
};
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- TEST UTILITIES ---

fn create_test_state() -> AppState {
    AppState {
        repo: Arc::new(MemoryRepository::new()),
        config: AppConfig::default(),
    }
}

async fn registered(state: &AppState, name: &str) -> AuthUser {
    let (status, Json(view)) = users::register(
        State(state.clone()),
        Json(RegisterRequest {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password: "secret".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    AuthUser {
        id: view.id,
        username: view.username,
        role: AccountRole::User,
    }
}

fn admin_user(user: &AuthUser) -> AuthUser {
    AuthUser {
        role: AccountRole::Admin,
        ..user.clone()
    }
}

/// A group owned by `owner` with one post by the owner.
async fn seeded_group(state: &AppState, owner: &AuthUser) -> (Uuid, Uuid) {
    let group = service::groups::create(
        state.repo.as_ref(),
        owner,
        NewGroup {
            name: "rustaceans".to_string(),
            description: "crabs".to_string(),
            public: true,
            avatar: None,
        },
    )
    .await
    .unwrap();
    let post = service::content::create_post(
        state.repo.as_ref(),
        owner,
        NewPost {
            group_id: group.id,
            content: "hello".to_string(),
            image: None,
        },
    )
    .await
    .unwrap();
    (group.id, post.id)
}

async fn body_json<T: DeserializeOwned>(response: impl IntoResponse) -> (StatusCode, T) {
    let (parts, body) = response.into_response().into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    (parts.status, serde_json::from_slice(&bytes).unwrap())
}

// --- HANDLER TESTS ---

#[test]
async fn test_register_duplicate_returns_conflict_body() {
    let state = create_test_state();
    registered(&state, "alice").await;

    let result = users::register(
        State(state.clone()),
        Json(RegisterRequest {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            password: "secret".to_string(),
        }),
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(err, AppError::Conflict("Username is already taken".to_string()));

    let (status, body): (StatusCode, serde_json::Value) = body_json(err).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["detail"], "Username is already taken");
}

#[test]
async fn test_get_me_never_exposes_password_hash() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;

    let response = users::get_me(alice, State(state)).await.unwrap();
    let (status, body): (StatusCode, serde_json::Value) = body_json(response).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body.get("hashed_password").is_none());
    assert!(body["avatar"].is_null());
}

#[test]
async fn test_get_user_forbidden_for_other_users() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    let bob = registered(&state, "bob").await;

    let result = users::get_user(bob, State(state.clone()), Path(alice.id)).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let err = result.unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[test]
async fn test_admin_list_users_forbidden_for_regular_user() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;

    let result = admin::list_users(alice, State(state), Query(UserFilter::default())).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
async fn test_admin_list_users_success() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    registered(&state, "bob").await;

    let Json(users) = admin::list_users(
        admin_user(&alice),
        State(state),
        Query(UserFilter {
            role: Some("user".to_string()),
            ..UserFilter::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(users.len(), 2);
}

#[test]
async fn test_admin_list_posts_success() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    seeded_group(&state, &alice).await;

    let Json(all) = admin::list_posts(admin_user(&alice), State(state))
        .await
        .unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(all[0].author.username, "alice");
}

#[test]
async fn test_join_and_members_handlers() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    let bob = registered(&state, "bob").await;
    let (group_id, _) = seeded_group(&state, &alice).await;

    let Json(first) = groups::join_group(bob.clone(), State(state.clone()), Path(group_id))
        .await
        .unwrap();
    let Json(second) = groups::join_group(bob.clone(), State(state.clone()), Path(group_id))
        .await
        .unwrap();
    assert_eq!(first.status, JoinOutcome::Joined);
    assert_eq!(second.status, JoinOutcome::AlreadyMember);

    let Json(members) = groups::group_members(bob, State(state), Path(group_id))
        .await
        .unwrap();
    assert_eq!(members.len(), 2);
}

#[test]
async fn test_add_member_on_behalf_forbidden() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    let bob = registered(&state, "bob").await;
    let carol = registered(&state, "carol").await;
    let (group_id, _) = seeded_group(&state, &alice).await;

    let result = groups::add_member(carol, State(state), Path((group_id, bob.id))).await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
async fn test_search_and_pagination_handlers() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    seeded_group(&state, &alice).await;

    let Json(found) = groups::search_groups(
        alice.clone(),
        State(state.clone()),
        Query(GroupSearchQuery {
            name: "Rust".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].is_member);

    let Json(page) = groups::list_groups(
        alice,
        State(state),
        Query(Pagination {
            limit: Some(10),
            offset: Some(1),
        }),
    )
    .await
    .unwrap();
    assert!(page.is_empty());
}

#[test]
async fn test_get_group_not_found() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;

    let result = groups::get_group(alice, State(state), Path(Uuid::new_v4())).await;

    let err = result.unwrap_err();
    assert_eq!(err, AppError::NotFound("Group not found".to_string()));
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_comment_and_reaction_handlers() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    let (_, post_id) = seeded_group(&state, &alice).await;

    let (status, Json(comment)) = posts::add_comment(
        alice.clone(),
        State(state.clone()),
        Path(post_id),
        Json(CommentRequest {
            text: "first".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment.author.username, "alice");

    let Json(reaction) = posts::react_to_comment(
        alice.clone(),
        State(state.clone()),
        Path(comment.id),
        Json(ReactionRequest {
            reaction_type: "like".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(reaction.status, ReactionStatus::Added);

    let response = posts::get_post(alice, State(state), Path(post_id))
        .await
        .unwrap();
    let (status, detail): (StatusCode, PostDetail) = body_json(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail.comments.len(), 1);
    assert_eq!(detail.comments[0].reactions.len(), 1);
}

#[test]
async fn test_edit_post_by_non_author_forbidden() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    let bob = registered(&state, "bob").await;
    let (group_id, post_id) = seeded_group(&state, &alice).await;
    service::groups::join(state.repo.as_ref(), &bob, group_id, bob.id)
        .await
        .unwrap();

    let result = posts::edit_post(
        bob,
        State(state.clone()),
        Path(post_id),
        Json(EditPostRequest {
            content: "mine now".to_string(),
        }),
    )
    .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let Json(edited) = posts::edit_post(
        alice,
        State(state),
        Path(post_id),
        Json(EditPostRequest {
            content: "edited".to_string(),
        }),
    )
    .await
    .unwrap();
    assert_eq!(edited.content, "edited");
}

#[test]
async fn test_delete_group_handler_cascades() {
    let state = create_test_state();
    let alice = registered(&state, "alice").await;
    let (group_id, post_id) = seeded_group(&state, &alice).await;

    let Json(message) = groups::delete_group(alice.clone(), State(state.clone()), Path(group_id))
        .await
        .unwrap();
    assert_eq!(message.message, "Group deleted");

    let result = posts::get_post(alice, State(state), Path(post_id)).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}
