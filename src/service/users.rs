use uuid::Uuid;

use super::{found, non_blank};
use crate::{
    auth::{self, AuthUser},
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        LoginForm, LoginResponse, NewUser, RegisterRequest, User, UserChanges, UserFilter,
        UserUpdate,
    },
    policy,
    repository::Repository,
};

fn checked_email(raw: &str) -> AppResult<String> {
    let email = non_blank(raw, "Email")?;
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(email)
}

/// register
///
/// Creates an account with the default role and status. The password is hashed before it
/// reaches the repository. A taken username or email is a `Conflict`.
pub async fn register(repo: &dyn Repository, request: RegisterRequest) -> AppResult<User> {
    let username = non_blank(&request.username, "Username")?;
    let email = checked_email(&request.email)?;
    if request.password.is_empty() {
        return Err(AppError::BadRequest("Password cannot be empty".to_string()));
    }

    let hashed_password = auth::hash_password(&request.password)?;
    let user = repo
        .create_user(NewUser {
            username,
            email,
            hashed_password,
        })
        .await?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// login
///
/// Exchanges credentials for a bearer token.
pub async fn login(
    repo: &dyn Repository,
    config: &AppConfig,
    form: LoginForm,
) -> AppResult<LoginResponse> {
    let user = auth::authenticate(repo, &form.username, &form.password).await?;
    let access_token = auth::issue_token(&user, config)?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(LoginResponse {
        access_token,
        token_type: "bearer".to_string(),
        username: user.username,
    })
}

pub async fn get(repo: &dyn Repository, actor: &AuthUser, user_id: Uuid) -> AppResult<User> {
    policy::ensure_can_act_for(actor, user_id)?;
    found(repo.get_user(user_id).await?, "User")
}

pub async fn me(repo: &dyn Repository, actor: &AuthUser) -> AppResult<User> {
    found(repo.get_user(actor.id).await?, "User")
}

/// update
///
/// Applies the provided fields only. A new password is re-hashed; a new email must not
/// belong to another account.
pub async fn update(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: Uuid,
    update: UserUpdate,
) -> AppResult<User> {
    policy::ensure_can_act_for(actor, user_id)?;
    found(repo.get_user(user_id).await?, "User")?;

    let email = match update.email {
        Some(email) => {
            let email = checked_email(&email)?;
            if repo
                .get_user_by_email(&email)
                .await?
                .is_some_and(|other| other.id != user_id)
            {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
            Some(email)
        }
        None => None,
    };

    let hashed_password = match update.password.filter(|p| !p.is_empty()) {
        Some(password) => Some(auth::hash_password(&password)?),
        None => None,
    };

    let changes = UserChanges {
        email,
        hashed_password,
        avatar: update.avatar,
    };
    let user = found(repo.update_user(user_id, changes).await?, "User")?;

    tracing::info!(user_id = %user.id, actor = %actor.id, "user updated");
    Ok(user)
}

/// delete
///
/// Removes the account together with its memberships and everything it authored.
pub async fn delete(repo: &dyn Repository, actor: &AuthUser, user_id: Uuid) -> AppResult<()> {
    policy::ensure_can_act_for(actor, user_id)?;
    if !repo.delete_user(user_id).await? {
        return Err(AppError::not_found("User"));
    }

    tracing::info!(user_id = %user_id, actor = %actor.id, "user deleted");
    Ok(())
}

/// Admin-only directory listing.
pub async fn list(
    repo: &dyn Repository,
    actor: &AuthUser,
    filter: &UserFilter,
) -> AppResult<Vec<User>> {
    policy::ensure_admin(actor)?;
    repo.list_users(filter).await
}
