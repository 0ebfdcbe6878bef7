//! Domain operations.
//!
//! Each function takes the repository, the resolved caller and the operation's inputs.
//! Existence and authorization checks run first; nothing is written until they pass.

pub mod content;
pub mod groups;
pub mod users;

use crate::error::{AppError, AppResult};

/// Turns a repository lookup into `NotFound("<what> not found")`.
pub(crate) fn found<T>(row: Option<T>, what: &str) -> AppResult<T> {
    row.ok_or_else(|| AppError::not_found(what))
}

/// Rejects blank free-text input.
pub(crate) fn non_blank(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{} cannot be empty", field)));
    }
    Ok(trimmed.to_string())
}
