use crate::{AppState, handlers::users};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a bearer token: the health probe and the two entry points
/// of the identity flow.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers and container orchestration.
        .route("/health", get(|| async { "ok" }))
        // POST /user/register
        // JSON body; answers 201 with the new account or 409 on a taken username/email.
        .route("/user/register", post(users::register))
        // POST /user/login
        // Form-encoded credentials in, bearer token out.
        .route("/user/login", post(users::login))
}
