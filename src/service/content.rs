use std::collections::HashMap;

use uuid::Uuid;

use super::{found, non_blank};
use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{
        CommentRecord, CommentView, NewPost, PostDetail, PostScope, PostView, ReactionRecord,
        ReactionResponse, ReactionStatus, ReactionTarget, ReactionToggle, ReactionView, User,
    },
    policy,
    repository::Repository,
};

async fn require_membership(
    repo: &dyn Repository,
    group_id: Uuid,
    user_id: Uuid,
) -> AppResult<()> {
    let membership = repo.get_membership(group_id, user_id).await?;
    policy::ensure_member(membership.as_ref())
}

/// Loads the caller's own row for the author block of freshly created content.
async fn author(repo: &dyn Repository, actor: &AuthUser) -> AppResult<User> {
    found(repo.get_user(actor.id).await?, "User")
}

// --- Posts ---

/// create_post
///
/// Members only. The post is returned with its author summary.
pub async fn create_post(
    repo: &dyn Repository,
    actor: &AuthUser,
    new_post: NewPost,
) -> AppResult<PostView> {
    found(repo.get_group(new_post.group_id).await?, "Group")?;
    require_membership(repo, new_post.group_id, actor.id).await?;
    let content = non_blank(&new_post.content, "Post content")?;

    let post = repo
        .create_post(actor.id, NewPost { content, ..new_post })
        .await?;
    tracing::info!(
        post_id = %post.id,
        group_id = %post.group_id,
        author = %actor.id,
        "post created"
    );

    let record = found(repo.get_post_record(post.id).await?, "Post")?;
    Ok(PostView::from(record))
}

pub async fn edit_post(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: Uuid,
    content: &str,
) -> AppResult<PostView> {
    let post = found(repo.get_post(post_id).await?, "Post")?;
    policy::ensure_author(actor, post.user_id, "post")?;
    let content = non_blank(content, "Post content")?;

    found(repo.update_post_content(post_id, content).await?, "Post")?;
    tracing::info!(post_id = %post_id, "post edited");

    let record = found(repo.get_post_record(post_id).await?, "Post")?;
    Ok(PostView::from(record))
}

/// delete_post
///
/// Author only. Comments and reactions under the post are removed with it.
pub async fn delete_post(repo: &dyn Repository, actor: &AuthUser, post_id: Uuid) -> AppResult<()> {
    let post = found(repo.get_post(post_id).await?, "Post")?;
    policy::ensure_author(actor, post.user_id, "post")?;

    if !repo.delete_post(post_id).await? {
        return Err(AppError::not_found("Post"));
    }
    tracing::info!(post_id = %post_id, "post deleted");
    Ok(())
}

// --- Comments ---

pub async fn comment(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: Uuid,
    text: &str,
) -> AppResult<CommentView> {
    let post = found(repo.get_post(post_id).await?, "Post")?;
    require_membership(repo, post.group_id, actor.id).await?;
    let text = non_blank(text, "Comment")?;

    let author = author(repo, actor).await?;
    let comment = repo.create_comment(post_id, actor.id, text).await?;
    tracing::info!(comment_id = %comment.id, post_id = %post_id, "comment added");

    let record = CommentRecord {
        comment,
        author_username: author.username,
        author_avatar: author.avatar,
    };
    Ok(CommentView::new(record, Vec::new()))
}

pub async fn delete_comment(
    repo: &dyn Repository,
    actor: &AuthUser,
    comment_id: Uuid,
) -> AppResult<()> {
    let comment = found(repo.get_comment(comment_id).await?, "Comment")?;
    policy::ensure_author(actor, comment.user_id, "comment")?;

    if !repo.delete_comment(comment_id).await? {
        return Err(AppError::not_found("Comment"));
    }
    tracing::info!(comment_id = %comment_id, "comment deleted");
    Ok(())
}

// --- Reactions ---

/// react
///
/// Toggles the caller's reaction of `reaction_type` on a post or a comment. Membership is
/// checked against the group of the post (for a comment, the post it belongs to).
pub async fn react(
    repo: &dyn Repository,
    actor: &AuthUser,
    target: ReactionTarget,
    reaction_type: &str,
) -> AppResult<ReactionResponse> {
    let post_id = match target {
        ReactionTarget::Post(post_id) => post_id,
        ReactionTarget::Comment(comment_id) => {
            found(repo.get_comment(comment_id).await?, "Comment")?.post_id
        }
    };
    let post = found(repo.get_post(post_id).await?, "Post")?;
    require_membership(repo, post.group_id, actor.id).await?;

    let reaction_type = non_blank(reaction_type, "Reaction type")?.to_lowercase();

    match repo.toggle_reaction(target, actor.id, &reaction_type).await? {
        ReactionToggle::Removed => {
            tracing::debug!(?target, user_id = %actor.id, kind = %reaction_type, "reaction removed");
            Ok(ReactionResponse {
                status: ReactionStatus::Removed,
                reaction: None,
            })
        }
        ReactionToggle::Added(reaction) => {
            tracing::debug!(?target, user_id = %actor.id, kind = %reaction_type, "reaction added");
            let author = author(repo, actor).await?;
            let record = ReactionRecord {
                reaction,
                author_username: author.username,
                author_avatar: author.avatar,
            };
            Ok(ReactionResponse {
                status: ReactionStatus::Added,
                reaction: Some(ReactionView::from(record)),
            })
        }
    }
}

pub async fn delete_reaction(
    repo: &dyn Repository,
    actor: &AuthUser,
    reaction_id: Uuid,
) -> AppResult<()> {
    let reaction = found(repo.get_reaction(reaction_id).await?, "Reaction")?;
    policy::ensure_author(actor, reaction.user_id, "reaction")?;

    if !repo.delete_reaction(reaction_id).await? {
        return Err(AppError::not_found("Reaction"));
    }
    Ok(())
}

// --- Listings ---

/// Posts written by `user_id`, newest first. Visible to that user and to global admins.
pub async fn list_for_user(
    repo: &dyn Repository,
    actor: &AuthUser,
    user_id: Uuid,
) -> AppResult<Vec<PostView>> {
    policy::ensure_can_act_for(actor, user_id)?;
    let posts = repo.list_posts(PostScope::Author(user_id)).await?;
    Ok(posts.into_iter().map(PostView::from).collect())
}

pub async fn list_for_group(
    repo: &dyn Repository,
    actor: &AuthUser,
    group_id: Uuid,
) -> AppResult<Vec<PostView>> {
    found(repo.get_group(group_id).await?, "Group")?;
    require_membership(repo, group_id, actor.id).await?;
    let posts = repo.list_posts(PostScope::Group(group_id)).await?;
    Ok(posts.into_iter().map(PostView::from).collect())
}

pub async fn list_all(repo: &dyn Repository, actor: &AuthUser) -> AppResult<Vec<PostView>> {
    policy::ensure_admin(actor)?;
    let posts = repo.list_posts(PostScope::All).await?;
    Ok(posts.into_iter().map(PostView::from).collect())
}

/// get_detail
///
/// The post with its comments (oldest first) and reactions. Reactions on a comment are
/// nested under that comment; the top-level list holds only reactions on the post.
pub async fn get_detail(
    repo: &dyn Repository,
    actor: &AuthUser,
    post_id: Uuid,
) -> AppResult<PostDetail> {
    let record = found(repo.get_post_record(post_id).await?, "Post")?;
    require_membership(repo, record.post.group_id, actor.id).await?;

    let comments = repo.list_comments(post_id).await?;
    let mut post_reactions = Vec::new();
    let mut by_comment: HashMap<Uuid, Vec<ReactionView>> = HashMap::new();
    for reaction in repo.list_reactions(post_id).await? {
        match reaction.reaction.comment_id {
            Some(comment_id) => by_comment
                .entry(comment_id)
                .or_default()
                .push(ReactionView::from(reaction)),
            None => post_reactions.push(ReactionView::from(reaction)),
        }
    }

    let comments = comments
        .into_iter()
        .map(|c| {
            let reactions = by_comment.remove(&c.comment.id).unwrap_or_default();
            CommentView::new(c, reactions)
        })
        .collect();

    Ok(PostDetail {
        post: PostView::from(record),
        comments,
        reactions: post_reactions,
    })
}
