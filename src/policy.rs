//! Authorization rules.
//!
//! Pure predicates over the caller identity and the rows an operation touches. Services
//! call the `ensure_*` forms before any mutation so a denied request has no side effects.
//! The global account role and the per-group membership role are separate inputs.

use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{AccountRole, GroupRole, Membership},
};

/// Global administrators hold `AccountRole::Admin`.
pub fn is_admin(actor: &AuthUser) -> bool {
    actor.role == AccountRole::Admin
}

/// Account-level actions (view, update, delete a user; join on someone's behalf)
/// are allowed to the account owner and to global admins.
pub fn can_act_for(actor: &AuthUser, user_id: Uuid) -> bool {
    actor.id == user_id || is_admin(actor)
}

pub fn is_author(actor: &AuthUser, author_id: Uuid) -> bool {
    actor.id == author_id
}

pub fn is_member(membership: Option<&Membership>) -> bool {
    membership.is_some()
}

/// Group management (update, delete) requires an admin membership in that group.
/// A global admin role alone does not grant it.
pub fn can_manage_group(membership: Option<&Membership>) -> bool {
    membership.is_some_and(|m| m.group_role() == GroupRole::Admin)
}

pub fn ensure_admin(actor: &AuthUser) -> AppResult<()> {
    if is_admin(actor) {
        Ok(())
    } else {
        Err(AppError::forbidden("Insufficient permissions"))
    }
}

pub fn ensure_can_act_for(actor: &AuthUser, user_id: Uuid) -> AppResult<()> {
    if can_act_for(actor, user_id) {
        Ok(())
    } else {
        Err(AppError::forbidden("Insufficient permissions"))
    }
}

pub fn ensure_author(actor: &AuthUser, author_id: Uuid, what: &str) -> AppResult<()> {
    if is_author(actor, author_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(format!(
            "Only the author can modify this {}",
            what
        )))
    }
}

pub fn ensure_member(membership: Option<&Membership>) -> AppResult<()> {
    if is_member(membership) {
        Ok(())
    } else {
        Err(AppError::forbidden("You are not a member of this group"))
    }
}

pub fn ensure_group_admin(membership: Option<&Membership>) -> AppResult<()> {
    if can_manage_group(membership) {
        Ok(())
    } else {
        Err(AppError::forbidden(
            "You don't have permission to manage this group",
        ))
    }
}

/// "like" and "dislike" exclude each other; every other reaction type toggles on its own.
pub fn opposite_reaction(reaction_type: &str) -> Option<&'static str> {
    match reaction_type {
        "like" => Some("dislike"),
        "dislike" => Some("like"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: AccountRole) -> AuthUser {
        AuthUser {
            id: Uuid::from_u128(1),
            username: "alice".to_string(),
            role,
        }
    }

    fn membership(role: &str) -> Membership {
        Membership {
            group_id: Uuid::from_u128(10),
            user_id: Uuid::from_u128(1),
            role: role.to_string(),
        }
    }

    #[test]
    fn account_actions_allow_self_and_admin() {
        let user = actor(AccountRole::User);
        assert!(can_act_for(&user, Uuid::from_u128(1)));
        assert!(!can_act_for(&user, Uuid::from_u128(2)));
        assert!(can_act_for(&actor(AccountRole::Admin), Uuid::from_u128(2)));
    }

    #[test]
    fn group_management_needs_group_admin_membership() {
        assert!(can_manage_group(Some(&membership("admin"))));
        assert!(!can_manage_group(Some(&membership("user"))));
        assert!(!can_manage_group(None));
        assert!(matches!(
            ensure_group_admin(None),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn membership_is_required_for_content() {
        assert!(ensure_member(Some(&membership("user"))).is_ok());
        assert!(matches!(ensure_member(None), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn authorship_is_not_overridden_by_admin_role() {
        let admin = actor(AccountRole::Admin);
        assert!(ensure_author(&admin, Uuid::from_u128(1), "post").is_ok());
        assert!(ensure_author(&admin, Uuid::from_u128(9), "post").is_err());
    }

    #[test]
    fn like_and_dislike_are_opposites() {
        assert_eq!(opposite_reaction("like"), Some("dislike"));
        assert_eq!(opposite_reaction("dislike"), Some("like"));
        assert_eq!(opposite_reaction("heart"), None);
    }
}
