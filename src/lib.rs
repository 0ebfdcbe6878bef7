use axum::{
    Router,
    extract::{DefaultBodyLimit, FromRef, Request},
    http::{HeaderName, HeaderValue},
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Core application services and components.
pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod media;
pub mod models;
pub mod policy;
pub mod repository;
pub mod service;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::users::register, handlers::users::login, handlers::users::get_me,
        handlers::users::get_user, handlers::users::update_user, handlers::users::delete_user,
        handlers::groups::create_group, handlers::groups::list_groups,
        handlers::groups::my_groups, handlers::groups::search_groups,
        handlers::groups::get_group_by_name, handlers::groups::get_group,
        handlers::groups::update_group, handlers::groups::delete_group,
        handlers::groups::join_group, handlers::groups::add_member,
        handlers::groups::leave_group, handlers::groups::group_members,
        handlers::posts::create_post, handlers::posts::posts_by_user,
        handlers::posts::posts_by_group, handlers::posts::get_post, handlers::posts::edit_post,
        handlers::posts::delete_post, handlers::posts::add_comment,
        handlers::posts::delete_comment, handlers::posts::react_to_post,
        handlers::posts::react_to_comment, handlers::posts::delete_reaction,
        handlers::admin::list_users, handlers::admin::list_posts
    ),
    components(
        schemas(
            models::AccountRole, models::GroupRole, models::RegisterRequest, models::LoginForm,
            models::LoginResponse, models::UserView, models::GroupView,
            models::GroupMembershipView, models::MemberView, models::JoinOutcome,
            models::JoinResponse, models::AuthorSummary, models::PostView, models::CommentView,
            models::ReactionView, models::PostDetail, models::EditPostRequest,
            models::CommentRequest, models::ReactionRequest, models::ReactionStatus,
            models::ReactionResponse, models::MessageResponse, error::ErrorBody,
        )
    ),
    tags(
        (name = "social-hub", description = "Groups, posts, comments and reactions API")
    )
)]
struct ApiDoc;

/// AppState
///
/// The single shared container handed to every handler. Cloning is cheap: the repository
/// is behind an `Arc` and the configuration is small.
#[derive(Clone)]
pub struct AppState {
    /// Persistence layer: Postgres in production, in-memory for local runs and tests.
    pub repo: RepositoryState,
    /// The loaded, immutable environment configuration.
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets extractors such as `AuthUser` pull just the component they need from `AppState`.

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guards `authenticated_routes`. Extracting `AuthUser` runs the full token check; a
/// failure rejects with 403 before the handler is reached.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// Builds the CORS layer. An empty origin list allows any origin.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}

/// create_router
///
/// Assembles the routing structure, applies scoped and global middleware, and registers
/// the application state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS and upload size policy from configuration.
    let cors = cors_layer(&state.config.cors_origins);
    let body_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Admin role is checked behind the handlers, after `AuthUser` extraction.
        .nest("/admin", admin::admin_routes())
        .layer(body_limit)
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens one span per request carrying method, URI and the `x-request-id`, so every log
/// line of a request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
