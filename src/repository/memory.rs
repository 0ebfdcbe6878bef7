use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::Repository;
use crate::{
    error::{AppError, AppResult},
    models::{
        Comment, CommentRecord, Group, GroupChanges, GroupMembershipRecord, GroupRole,
        MemberRecord, Membership, NewGroup, NewPost, NewUser, Post, PostRecord, PostScope,
        Reaction, ReactionRecord, ReactionTarget, ReactionToggle, User, UserChanges, UserFilter,
    },
    policy,
};

/// Tables
///
/// Every table lives behind the same lock, so each trait method runs as one unit.
/// Rows are kept in insertion order.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    memberships: Vec<Membership>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    reactions: Vec<Reaction>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn post_record(&self, post: &Post) -> Option<PostRecord> {
        self.user(post.user_id).map(|author| PostRecord {
            post: post.clone(),
            author_username: author.username.clone(),
            author_avatar: author.avatar.clone(),
        })
    }

    fn membership_record(&self, group: &Group, user_id: Uuid) -> GroupMembershipRecord {
        GroupMembershipRecord {
            group: group.clone(),
            member_role: self
                .memberships
                .iter()
                .find(|m| m.group_id == group.id && m.user_id == user_id)
                .map(|m| m.role.clone()),
        }
    }

    /// Removes the given posts together with their comments and every reaction on either.
    fn remove_posts(&mut self, post_ids: &HashSet<Uuid>) {
        let comment_ids: HashSet<Uuid> = self
            .comments
            .iter()
            .filter(|c| post_ids.contains(&c.post_id))
            .map(|c| c.id)
            .collect();

        self.reactions.retain(|r| {
            !r.post_id.is_some_and(|id| post_ids.contains(&id))
                && !r.comment_id.is_some_and(|id| comment_ids.contains(&id))
        });
        self.comments.retain(|c| !comment_ids.contains(&c.id));
        self.posts.retain(|p| !post_ids.contains(&p.id));
    }

    fn ensure_unique_user(
        &self,
        username: &str,
        email: &str,
        except: Option<Uuid>,
    ) -> AppResult<()> {
        let others = self.users.iter().filter(|u| Some(u.id) != except);
        for user in others {
            if user.username == username {
                return Err(AppError::Conflict("Username is already taken".to_string()));
            }
            if user.email == email {
                return Err(AppError::Conflict("Email is already in use".to_string()));
            }
        }
        Ok(())
    }

    fn ensure_unique_group(&self, name: &str, except: Option<Uuid>) -> AppResult<()> {
        if self
            .groups
            .iter()
            .any(|g| g.name == name && Some(g.id) != except)
        {
            return Err(AppError::Conflict("Group already exists".to_string()));
        }
        Ok(())
    }
}

/// MemoryRepository
///
/// A complete `Repository` held in process memory. Used when no `DATABASE_URL` is
/// configured for local runs, and as the backing store of the test suite.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- USERS ---

    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        tables.ensure_unique_user(&new_user.username, &new_user.email, None)?;

        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username,
            email: new_user.email,
            hashed_password: new_user.hashed_password,
            avatar: None,
            registration_date: Utc::now(),
            role: "user".to_string(),
            status: "active".to_string(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.read().await.user(id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let matches = |wanted: &Option<String>, actual: &str| {
            wanted.as_deref().is_none_or(|value| value == actual)
        };
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| {
                matches(&filter.username, &u.username)
                    && matches(&filter.email, &u.email)
                    && matches(&filter.role, &u.role)
                    && matches(&filter.status, &u.status)
            })
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let mut tables = self.tables.write().await;
        let Some(current) = tables.user(id).cloned() else {
            return Ok(None);
        };
        if let Some(email) = &changes.email {
            tables.ensure_unique_user(&current.username, email, Some(id))?;
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(hashed_password) = changes.hashed_password {
            user.hashed_password = hashed_password;
        }
        if let Some(avatar) = changes.avatar {
            user.avatar = Some(avatar);
        }
        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.user(id).is_none() {
            return Ok(false);
        }

        let own_posts: HashSet<Uuid> = tables
            .posts
            .iter()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        tables.remove_posts(&own_posts);

        let own_comments: HashSet<Uuid> = tables
            .comments
            .iter()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        tables.reactions.retain(|r| {
            r.user_id != id && !r.comment_id.is_some_and(|c| own_comments.contains(&c))
        });
        tables.comments.retain(|c| c.user_id != id);
        tables.memberships.retain(|m| m.user_id != id);
        tables.users.retain(|u| u.id != id);
        Ok(true)
    }

    // --- GROUPS ---

    async fn create_group(&self, new_group: NewGroup, creator_id: Uuid) -> AppResult<Group> {
        let mut tables = self.tables.write().await;
        tables.ensure_unique_group(&new_group.name, None)?;

        let group = Group {
            id: Uuid::new_v4(),
            name: new_group.name,
            description: new_group.description,
            avatar: new_group.avatar,
            creation_date: Utc::now(),
            public: new_group.public,
        };
        tables.groups.push(group.clone());
        tables.memberships.push(Membership {
            group_id: group.id,
            user_id: creator_id,
            role: GroupRole::Admin.as_str().to_string(),
        });
        Ok(group)
    }

    async fn get_group(&self, id: Uuid) -> AppResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.id == id).cloned())
    }

    async fn get_group_by_name(&self, name: &str) -> AppResult<Option<Group>> {
        let tables = self.tables.read().await;
        Ok(tables.groups.iter().find(|g| g.name == name).cloned())
    }

    async fn list_groups(&self, limit: i64, offset: i64) -> AppResult<Vec<Group>> {
        let tables = self.tables.read().await;
        Ok(tables
            .groups
            .iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn search_groups(
        &self,
        pattern: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<GroupMembershipRecord>> {
        let needle = pattern.to_lowercase();
        let tables = self.tables.read().await;
        let mut found: Vec<GroupMembershipRecord> = tables
            .groups
            .iter()
            .filter(|g| g.name.to_lowercase().contains(&needle))
            .map(|g| tables.membership_record(g, user_id))
            .collect();
        found.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(found)
    }

    async fn groups_for_user(&self, user_id: Uuid) -> AppResult<Vec<GroupMembershipRecord>> {
        let tables = self.tables.read().await;
        let mut found: Vec<GroupMembershipRecord> = tables
            .groups
            .iter()
            .filter(|g| {
                tables
                    .memberships
                    .iter()
                    .any(|m| m.group_id == g.id && m.user_id == user_id)
            })
            .map(|g| tables.membership_record(g, user_id))
            .collect();
        found.sort_by(|a, b| a.group.name.cmp(&b.group.name));
        Ok(found)
    }

    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> AppResult<Option<Group>> {
        let mut tables = self.tables.write().await;
        if let Some(name) = &changes.name {
            tables.ensure_unique_group(name, Some(id))?;
        }

        let Some(group) = tables.groups.iter_mut().find(|g| g.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            group.name = name;
        }
        if let Some(description) = changes.description {
            group.description = description;
        }
        if let Some(public) = changes.public {
            group.public = public;
        }
        if let Some(avatar) = changes.avatar {
            group.avatar = Some(avatar);
        }
        Ok(Some(group.clone()))
    }

    async fn delete_group(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.groups.iter().any(|g| g.id == id) {
            return Ok(false);
        }

        let posts: HashSet<Uuid> = tables
            .posts
            .iter()
            .filter(|p| p.group_id == id)
            .map(|p| p.id)
            .collect();
        tables.remove_posts(&posts);
        tables.memberships.retain(|m| m.group_id != id);
        tables.groups.retain(|g| g.id != id);
        Ok(true)
    }

    // --- MEMBERSHIPS ---

    async fn get_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Membership>> {
        let tables = self.tables.read().await;
        Ok(tables
            .memberships
            .iter()
            .find(|m| m.group_id == group_id && m.user_id == user_id)
            .cloned())
    }

    async fn add_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if tables
            .memberships
            .iter()
            .any(|m| m.group_id == group_id && m.user_id == user_id)
        {
            return Ok(false);
        }
        tables.memberships.push(Membership {
            group_id,
            user_id,
            role: role.as_str().to_string(),
        });
        Ok(true)
    }

    async fn remove_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.memberships.len();
        tables
            .memberships
            .retain(|m| !(m.group_id == group_id && m.user_id == user_id));
        Ok(tables.memberships.len() < before)
    }

    async fn list_members(&self, group_id: Uuid) -> AppResult<Vec<MemberRecord>> {
        let tables = self.tables.read().await;
        let mut members: Vec<MemberRecord> = tables
            .memberships
            .iter()
            .filter(|m| m.group_id == group_id)
            .filter_map(|m| {
                tables.user(m.user_id).map(|u| MemberRecord {
                    id: u.id,
                    username: u.username.clone(),
                    email: u.email.clone(),
                    avatar: u.avatar.clone(),
                    registration_date: u.registration_date,
                    role_in_group: m.role.clone(),
                })
            })
            .collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(members)
    }

    // --- POSTS ---

    async fn create_post(&self, author_id: Uuid, new_post: NewPost) -> AppResult<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            group_id: new_post.group_id,
            user_id: author_id,
            content: new_post.content,
            image: new_post.image,
            created_at: Utc::now(),
        };
        self.tables.write().await.posts.push(post.clone());
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn get_post_record(&self, id: Uuid) -> AppResult<Option<PostRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| tables.post_record(p)))
    }

    async fn list_posts(&self, scope: PostScope) -> AppResult<Vec<PostRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .rev()
            .filter(|p| match scope {
                PostScope::Author(user_id) => p.user_id == user_id,
                PostScope::Group(group_id) => p.group_id == group_id,
                PostScope::All => true,
            })
            .filter_map(|p| tables.post_record(p))
            .collect())
    }

    async fn update_post_content(&self, id: Uuid, content: String) -> AppResult<Option<Post>> {
        let mut tables = self.tables.write().await;
        Ok(tables.posts.iter_mut().find(|p| p.id == id).map(|post| {
            post.content = content;
            post.clone()
        }))
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == id) {
            return Ok(false);
        }
        tables.remove_posts(&HashSet::from([id]));
        Ok(true)
    }

    // --- COMMENTS ---

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment> {
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            user_id: author_id,
            text,
            created_at: Utc::now(),
        };
        self.tables.write().await.comments.push(comment.clone());
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn list_comments(&self, post_id: Uuid) -> AppResult<Vec<CommentRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                tables.user(c.user_id).map(|author| CommentRecord {
                    comment: c.clone(),
                    author_username: author.username.clone(),
                    author_avatar: author.avatar.clone(),
                })
            })
            .collect())
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.comments.iter().any(|c| c.id == id) {
            return Ok(false);
        }
        tables.reactions.retain(|r| r.comment_id != Some(id));
        tables.comments.retain(|c| c.id != id);
        Ok(true)
    }

    // --- REACTIONS ---

    async fn toggle_reaction(
        &self,
        target: ReactionTarget,
        user_id: Uuid,
        reaction_type: &str,
    ) -> AppResult<ReactionToggle> {
        let mut tables = self.tables.write().await;
        let same_target = |r: &Reaction| r.user_id == user_id && r.target() == Some(target);

        if let Some(pos) = tables
            .reactions
            .iter()
            .position(|r| same_target(r) && r.reaction_type == reaction_type)
        {
            tables.reactions.remove(pos);
            return Ok(ReactionToggle::Removed);
        }

        if let Some(opposite) = policy::opposite_reaction(reaction_type) {
            tables
                .reactions
                .retain(|r| !(same_target(r) && r.reaction_type == opposite));
        }

        let (post_id, comment_id) = match target {
            ReactionTarget::Post(id) => (Some(id), None),
            ReactionTarget::Comment(id) => (None, Some(id)),
        };
        let reaction = Reaction {
            id: Uuid::new_v4(),
            post_id,
            comment_id,
            user_id,
            reaction_type: reaction_type.to_string(),
            created_at: Utc::now(),
        };
        tables.reactions.push(reaction.clone());
        Ok(ReactionToggle::Added(reaction))
    }

    async fn get_reaction(&self, id: Uuid) -> AppResult<Option<Reaction>> {
        let tables = self.tables.read().await;
        Ok(tables.reactions.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reactions(&self, post_id: Uuid) -> AppResult<Vec<ReactionRecord>> {
        let tables = self.tables.read().await;
        let comment_ids: HashSet<Uuid> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect();

        Ok(tables
            .reactions
            .iter()
            .filter(|r| {
                r.post_id == Some(post_id)
                    || r.comment_id.is_some_and(|id| comment_ids.contains(&id))
            })
            .filter_map(|r| {
                tables.user(r.user_id).map(|author| ReactionRecord {
                    reaction: r.clone(),
                    author_username: author.username.clone(),
                    author_avatar: author.avatar.clone(),
                })
            })
            .collect())
    }

    async fn delete_reaction(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.reactions.len();
        tables.reactions.retain(|r| r.id != id);
        Ok(tables.reactions.len() < before)
    }
}
