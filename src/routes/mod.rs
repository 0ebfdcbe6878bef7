//! Router Module Index
//!
//! Routes are split by access scope so the authentication layer is applied per module
//! rather than per handler.

/// Registration, login and health. No token required.
pub mod public;

/// Routes behind the `AuthUser` middleware.
pub mod authenticated;

/// Routes restricted to the global 'admin' role.
pub mod admin;
