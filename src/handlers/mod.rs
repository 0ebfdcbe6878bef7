//! HTTP handlers.
//!
//! Thin adapters: extract the caller and inputs, call the matching `service` function,
//! and wrap the result in a response. Errors convert through `AppError: IntoResponse`.

pub mod admin;
pub mod groups;
pub mod posts;
pub mod users;
