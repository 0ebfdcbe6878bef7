use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// AppError
///
/// The typed failure taxonomy shared by every layer of the application. Services return it,
/// the repository maps storage failures into it, and handlers convert it into an HTTP response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    /// The addressed entity does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A uniqueness rule (username, email, group name) was violated.
    #[error("{0}")]
    Conflict(String),
    /// The caller is authenticated but not allowed to perform the action.
    #[error("{0}")]
    Forbidden(String),
    #[error("Invalid user or password")]
    InvalidCredentials,
    #[error("Token is invalid or expired")]
    InvalidToken,
    /// Malformed input that never reached the authorization rules.
    #[error("{0}")]
    BadRequest(String),
    /// Unexpected failure. The detail is logged, never sent to the client.
    #[error("Internal server error")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{} not found", what))
    }

    pub fn forbidden(reason: &str) -> Self {
        AppError::Forbidden(reason.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// ErrorBody
///
/// JSON shape returned for every failed request.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            tracing::error!(error = %detail, "request failed with internal error");
        }
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Storage failures.
///
/// Unique violations become `Conflict` so that the database constraint, not a
/// pre-check, decides races between concurrent writers.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let message = match db_err.constraint() {
                    Some("users_username_key") => "Username is already taken",
                    Some("users_email_key") => "Email is already in use",
                    Some("groups_name_key") => "Group already exists",
                    Some("group_members_pkey") => "Already a member",
                    Some("reactions_post_unique") | Some("reactions_comment_unique") => {
                        "Reaction already exists"
                    }
                    _ => "Resource already exists",
                };
                return AppError::Conflict(message.to_string());
            }
        }
        AppError::Internal(format!("database error: {:?}", err))
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_taxonomy() {
        assert_eq!(AppError::not_found("Group").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Conflict("x".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::InvalidToken.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = AppError::Internal("connection refused on 10.0.0.3".into());
        assert_eq!(err.to_string(), "Internal server error");
    }

    #[test]
    fn non_database_sqlx_error_is_internal() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
