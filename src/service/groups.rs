use uuid::Uuid;

use super::{found, non_blank};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        Group, GroupChanges, GroupMembershipView, GroupRole, JoinOutcome, JoinResponse,
        MemberView, NewGroup,
    },
    policy,
    repository::Repository,
};

const DEFAULT_PAGE_SIZE: i64 = 500;

/// create
///
/// The creator becomes the group's first admin in the same unit of work.
pub async fn create(
    repo: &dyn Repository,
    actor: &AuthUser,
    new_group: NewGroup,
) -> AppResult<Group> {
    let name = non_blank(&new_group.name, "Group name")?;
    if repo.get_group_by_name(&name).await?.is_some() {
        return Err(AppError::Conflict("Group already exists".to_string()));
    }

    let group = repo
        .create_group(NewGroup { name, ..new_group }, actor.id)
        .await?;

    tracing::info!(group_id = %group.id, creator = %actor.id, "group created");
    Ok(group)
}

pub async fn get(repo: &dyn Repository, group_id: Uuid) -> AppResult<Group> {
    found(repo.get_group(group_id).await?, "Group")
}

pub async fn get_by_name(repo: &dyn Repository, name: &str) -> AppResult<Group> {
    found(repo.get_group_by_name(name).await?, "Group")
}

/// list
///
/// Pages through every group. `limit` defaults to 500 and never exceeds it.
pub async fn list(
    repo: &dyn Repository,
    limit: Option<i64>,
    offset: Option<i64>,
) -> AppResult<Vec<Group>> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, DEFAULT_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    repo.list_groups(limit, offset).await
}

pub async fn my_groups(
    repo: &dyn Repository,
    actor: &AuthUser,
) -> AppResult<Vec<GroupMembershipView>> {
    let groups = repo.groups_for_user(actor.id).await?;
    Ok(groups.into_iter().map(GroupMembershipView::from).collect())
}

/// join
///
/// Adds `user_id` to the group with the plain member role. Only that user or a global
/// admin may do so. Joining twice is not an error.
pub async fn join(
    repo: &dyn Repository,
    actor: &AuthUser,
    group_id: Uuid,
    user_id: Uuid,
) -> AppResult<JoinResponse> {
    policy::ensure_can_act_for(actor, user_id)?;
    found(repo.get_group(group_id).await?, "Group")?;
    found(repo.get_user(user_id).await?, "User")?;

    let status = if repo.add_membership(group_id, user_id, GroupRole::User).await? {
        tracing::info!(group_id = %group_id, user_id = %user_id, "member joined");
        JoinOutcome::Joined
    } else {
        JoinOutcome::AlreadyMember
    };

    Ok(JoinResponse {
        group_id,
        user_id,
        status,
    })
}

pub async fn leave(repo: &dyn Repository, actor: &AuthUser, group_id: Uuid) -> AppResult<()> {
    found(repo.get_group(group_id).await?, "Group")?;
    if !repo.remove_membership(group_id, actor.id).await? {
        return Err(AppError::not_found("Membership"));
    }

    tracing::info!(group_id = %group_id, user_id = %actor.id, "member left");
    Ok(())
}

/// update
///
/// Group admins only. Unset fields are kept; `public = false` is applied like any value.
pub async fn update(
    repo: &dyn Repository,
    actor: &AuthUser,
    group_id: Uuid,
    changes: GroupChanges,
) -> AppResult<Group> {
    found(repo.get_group(group_id).await?, "Group")?;
    let membership = repo.get_membership(group_id, actor.id).await?;
    policy::ensure_group_admin(membership.as_ref())?;

    let name = match changes.name {
        Some(name) => {
            let name = non_blank(&name, "Group name")?;
            if repo
                .get_group_by_name(&name)
                .await?
                .is_some_and(|other| other.id != group_id)
            {
                return Err(AppError::Conflict("Group already exists".to_string()));
            }
            Some(name)
        }
        None => None,
    };

    let group = found(
        repo.update_group(group_id, GroupChanges { name, ..changes })
            .await?,
        "Group",
    )?;

    tracing::info!(group_id = %group.id, actor = %actor.id, "group updated");
    Ok(group)
}

/// delete
///
/// Group admins only. Memberships, posts, comments and reactions go with the group.
pub async fn delete(repo: &dyn Repository, actor: &AuthUser, group_id: Uuid) -> AppResult<()> {
    found(repo.get_group(group_id).await?, "Group")?;
    let membership = repo.get_membership(group_id, actor.id).await?;
    policy::ensure_group_admin(membership.as_ref())?;

    if !repo.delete_group(group_id).await? {
        return Err(AppError::not_found("Group"));
    }

    tracing::info!(group_id = %group_id, actor = %actor.id, "group deleted");
    Ok(())
}

/// search
///
/// Case-insensitive substring match on the group name. No match is an empty list.
pub async fn search(
    repo: &dyn Repository,
    actor: &AuthUser,
    pattern: &str,
) -> AppResult<Vec<GroupMembershipView>> {
    let groups = repo.search_groups(pattern.trim(), actor.id).await?;
    Ok(groups.into_iter().map(GroupMembershipView::from).collect())
}

pub async fn members(repo: &dyn Repository, group_id: Uuid) -> AppResult<Vec<MemberView>> {
    found(repo.get_group(group_id).await?, "Group")?;
    let members = repo.list_members(group_id).await?;
    Ok(members.into_iter().map(MemberView::from).collect())
}
