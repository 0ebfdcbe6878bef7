use reqwest::{
    StatusCode,
    multipart::{Form, Part},
};
use serde_json::{Value, json};
use social_hub::{AppConfig, AppState, MemoryRepository, create_router};
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

async fn spawn_app() -> TestApp {
    let state = AppState {
        repo: Arc::new(MemoryRepository::new()),
        config: AppConfig::default(),
    };
    let router = create_router(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn register(&self, name: &str) -> Value {
        let response = self
            .client
            .post(self.url("/user/register"))
            .json(&json!({
                "username": name,
                "email": format!("{}@example.com", name),
                "password": "correct horse",
            }))
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.unwrap()
    }

    async fn login(&self, name: &str) -> String {
        let response = self
            .client
            .post(self.url("/user/login"))
            .form(&[("username", name), ("password", "correct horse")])
            .send()
            .await
            .expect("req fail");
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["token_type"], "bearer");
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Registers and logs in, returning (user id, token).
    async fn signed_up(&self, name: &str) -> (String, String) {
        let user = self.register(name).await;
        let token = self.login(name).await;
        (user["id"].as_str().unwrap().to_string(), token)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app
        .client
        .get(app.url("/health"))
        .send()
        .await
        .expect("req fail");

    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_protected_route_rejects_missing_or_bad_token() {
    let app = spawn_app().await;

    let missing = app.client.get(app.url("/user/me")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::FORBIDDEN);

    let garbage = app
        .client
        .get(app.url("/user/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::FORBIDDEN);
    let body: Value = garbage.json().await.unwrap();
    assert_eq!(body["detail"], "Token is invalid or expired");
}

#[tokio::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let app = spawn_app().await;
    app.register("alice").await;

    let response = app
        .client
        .post(app.url("/user/login"))
        .form(&[("username", "alice"), ("password", "wrong")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register("alice").await;

    let response = app
        .client
        .post(app.url("/user/register"))
        .json(&json!({
            "username": "alice",
            "email": "alice2@example.com",
            "password": "pw",
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_avatar_upload_round_trips_as_data_uri() {
    let app = spawn_app().await;
    let (alice_id, token) = app.signed_up("alice").await;

    let form = Form::new()
        .text("email", "alice@new.example.com")
        .part("avatar", Part::bytes(vec![0x89, 0x50, 0x4e, 0x47]).file_name("me.png"));
    let response = app
        .client
        .put(app.url(&format!("/user/{}", alice_id)))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "alice@new.example.com");
    assert_eq!(body["avatar"], "data:image/png;base64,iVBORw==");
}

#[tokio::test]
async fn test_group_post_reaction_flow() {
    let app = spawn_app().await;
    let (_, alice) = app.signed_up("alice").await;
    let (_, bob) = app.signed_up("bob").await;

    // alice creates a group
    let form = Form::new()
        .text("name", "rustaceans")
        .text("description", "crabs only")
        .text("public", "true");
    let response = app
        .client
        .post(app.url("/group"))
        .bearer_auth(&alice)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let group: Value = response.json().await.unwrap();
    let group_id = group["id"].as_str().unwrap().to_string();

    // bob cannot post before joining
    let post_form = || {
        Form::new()
            .text("group_id", group_id.clone())
            .text("content", "hello crabs")
    };
    let denied = app
        .client
        .post(app.url("/posts"))
        .bearer_auth(&bob)
        .multipart(post_form())
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    // bob joins and posts
    let joined: Value = app
        .client
        .post(app.url(&format!("/group/join/{}", group_id)))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(joined["status"], "joined");

    let response = app
        .client
        .post(app.url("/posts"))
        .bearer_auth(&bob)
        .multipart(post_form())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let post: Value = response.json().await.unwrap();
    let post_id = post["id"].as_str().unwrap().to_string();
    assert_eq!(post["author"]["username"], "bob");

    // alice likes, then dislikes: one "dislike" remains
    for kind in ["like", "dislike"] {
        let reaction: Value = app
            .client
            .post(app.url(&format!("/posts/{}/reaction", post_id)))
            .bearer_auth(&alice)
            .json(&json!({ "reaction_type": kind }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(reaction["status"], "added");
    }

    let detail: Value = app
        .client
        .get(app.url(&format!("/posts/{}", post_id)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let reactions = detail["reactions"].as_array().unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0]["type"], "dislike");

    // alice cannot edit bob's post
    let response = app
        .client
        .put(app.url(&format!("/posts/{}", post_id)))
        .bearer_auth(&alice)
        .json(&json!({ "content": "edited by alice" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // deleting the group removes the post
    let response = app
        .client
        .delete(app.url(&format!("/group/{}", group_id)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .client
        .get(app.url(&format!("/posts/{}", post_id)))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let app = spawn_app().await;
    let (_, token) = app.signed_up("alice").await;

    for path in ["/admin/users", "/admin/posts"] {
        let response = app
            .client
            .get(app.url(path))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = app
        .client
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"].get("/posts/{id}/reaction").is_some());
}
