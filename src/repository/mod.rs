use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Comment, CommentRecord, Group, GroupChanges, GroupMembershipRecord, GroupRole,
        MemberRecord, Membership, NewGroup, NewPost, NewUser, Post, PostRecord, PostScope,
        Reaction, ReactionRecord, ReactionTarget, ReactionToggle, User, UserChanges, UserFilter,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Repository Trait
///
/// The persistence contract. Services hold a `&dyn Repository` and never know which
/// backend they talk to.
///
/// Every method that touches more than one row (group creation with its admin membership,
/// the cascade deletes, the reaction toggle) is atomic: a concurrent reader observes
/// either none or all of its effects. Uniqueness is enforced here, not by callers, and is
/// reported as `AppError::Conflict`.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, new_user: NewUser) -> AppResult<User>;
    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>>;
    // Returns `None` when the user does not exist.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>>;
    /// Deletes the user and everything they own. Returns false if no such user.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool>;

    // --- Groups ---
    /// Inserts the group and the creator's admin membership in one unit.
    async fn create_group(&self, new_group: NewGroup, creator_id: Uuid) -> AppResult<Group>;
    async fn get_group(&self, id: Uuid) -> AppResult<Option<Group>>;
    async fn get_group_by_name(&self, name: &str) -> AppResult<Option<Group>>;
    async fn list_groups(&self, limit: i64, offset: i64) -> AppResult<Vec<Group>>;
    // Case-insensitive substring match, annotated with `user_id`'s membership role.
    async fn search_groups(
        &self,
        pattern: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<GroupMembershipRecord>>;
    async fn groups_for_user(&self, user_id: Uuid) -> AppResult<Vec<GroupMembershipRecord>>;
    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> AppResult<Option<Group>>;
    /// Deletes the group, its memberships, posts, and their comments and reactions.
    async fn delete_group(&self, id: Uuid) -> AppResult<bool>;

    // --- Memberships ---
    async fn get_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Membership>>;
    // Idempotent: returns true only if a new row was inserted.
    async fn add_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> AppResult<bool>;
    async fn remove_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool>;
    async fn list_members(&self, group_id: Uuid) -> AppResult<Vec<MemberRecord>>;

    // --- Posts ---
    async fn create_post(&self, author_id: Uuid, new_post: NewPost) -> AppResult<Post>;
    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>>;
    async fn get_post_record(&self, id: Uuid) -> AppResult<Option<PostRecord>>;
    // Newest first.
    async fn list_posts(&self, scope: PostScope) -> AppResult<Vec<PostRecord>>;
    async fn update_post_content(&self, id: Uuid, content: String) -> AppResult<Option<Post>>;
    /// Deletes the post with its comments and all reactions on either.
    async fn delete_post(&self, id: Uuid) -> AppResult<bool>;

    // --- Comments ---
    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment>;
    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>>;
    // Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> AppResult<Vec<CommentRecord>>;
    /// Deletes the comment and the reactions that target it.
    async fn delete_comment(&self, id: Uuid) -> AppResult<bool>;

    // --- Reactions ---
    /// The reaction toggle, as one atomic unit:
    /// an identical (user, target, type) reaction is removed and `Removed` returned;
    /// otherwise the opposite-type reaction (if any) is removed and the new one inserted.
    async fn toggle_reaction(
        &self,
        target: ReactionTarget,
        user_id: Uuid,
        reaction_type: &str,
    ) -> AppResult<ReactionToggle>;
    async fn get_reaction(&self, id: Uuid) -> AppResult<Option<Reaction>>;
    // Reactions on the post and on each of its comments.
    async fn list_reactions(&self, post_id: Uuid) -> AppResult<Vec<ReactionRecord>>;
    async fn delete_reaction(&self, id: Uuid) -> AppResult<bool>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
