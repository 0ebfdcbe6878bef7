use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{AccountRole, User},
    repository::{Repository, RepositoryState},
};

/// Claims
///
/// The payload carried inside every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the username of the account.
    pub sub: String,
    /// The account's UUID, used to re-load the user on each request.
    pub id: Uuid,
    /// The global account role at issue time.
    pub role: String,
    /// Issued At (iat).
    pub iat: usize,
    /// Expiration Time (exp). Tokens are rejected after this instant.
    pub exp: usize,
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Every protected service operation
/// takes one of these as its `actor`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    /// Current global role, read from storage rather than trusted from the token.
    pub role: AccountRole,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            username: user.username.clone(),
            role: user.account_role(),
        }
    }
}

// --- Passwords ---

/// Hashes a password with Argon2id into a PHC string.
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))
}

/// Checks a password against a stored PHC string. A malformed hash never verifies.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// authenticate
///
/// Resolves a username/password pair to a user. Unknown usernames and wrong passwords
/// fail identically with `InvalidCredentials`.
pub async fn authenticate(
    repo: &dyn Repository,
    username: &str,
    password: &str,
) -> AppResult<User> {
    let user = repo
        .get_user_by_username(username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(password, &user.hashed_password) {
        tracing::info!(username = %username, "login rejected: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

// --- Tokens ---

/// issue_token
///
/// Signs an HS256 token for the user that expires after `config.token_ttl_minutes`.
pub fn issue_token(user: &User, config: &AppConfig) -> AppResult<String> {
    let now = Utc::now();
    let expires = now + Duration::minutes(config.token_ttl_minutes);

    let claims = Claims {
        sub: user.username.clone(),
        id: user.id,
        role: user.role.clone(),
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("token encoding failed: {}", e)))
}

/// verify_token
///
/// Validates signature and expiry and requires a non-empty subject.
pub fn verify_token(token: &str, config: &AppConfig) -> AppResult<Claims> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_required_spec_claims(&["exp", "sub"]);

    let token_data = decode::<Claims>(token, &decoding_key, &validation).map_err(|e| {
        match e.kind() {
            ErrorKind::ExpiredSignature => tracing::debug!("token rejected: expired"),
            other => tracing::debug!(reason = ?other, "token rejected"),
        }
        AppError::InvalidToken
    })?;

    if token_data.claims.sub.is_empty() {
        return Err(AppError::InvalidToken);
    }

    Ok(token_data.claims)
}

/// AuthUser Extractor Implementation
///
/// Makes `AuthUser` usable as a handler argument. The flow is:
/// 1. Read the `Authorization: Bearer <token>` header.
/// 2. Verify the token (signature, expiry, subject).
/// 3. Re-load the user so deleted accounts are rejected and the current role is used.
///
/// Rejection: `AppError::InvalidToken` (403) on any failure.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::InvalidToken)?;

        let claims = verify_token(token, &config)?;

        let user = repo
            .get_user(claims.id)
            .await?
            .filter(|user| user.username == claims.sub)
            .ok_or(AppError::InvalidToken)?;

        Ok(AuthUser::from(&user))
    }
}
