use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use uuid::Uuid;

use super::Repository;
use crate::{
    error::AppResult,
    models::{
        Comment, CommentRecord, Group, GroupChanges, GroupMembershipRecord, GroupRole,
        MemberRecord, Membership, NewGroup, NewPost, NewUser, Post, PostRecord, PostScope,
        Reaction, ReactionRecord, ReactionTarget, ReactionToggle, User, UserChanges, UserFilter,
    },
    policy,
};

const USER_COLUMNS: &str =
    "id, username, email, hashed_password, avatar, registration_date, role, status";

const GROUP_COLUMNS: &str = "id, name, description, avatar, creation_date, public";

const POST_COLUMNS: &str = "id, group_id, user_id, content, image, created_at";

const COMMENT_COLUMNS: &str = "id, post_id, user_id, text, created_at";

const REACTION_COLUMNS: &str = "id, post_id, comment_id, user_id, type, created_at";

const POST_RECORD_SELECT: &str = r#"
    SELECT p.id, p.group_id, p.user_id, p.content, p.image, p.created_at,
           u.username AS author_username, u.avatar AS author_avatar
    FROM posts p
    JOIN users u ON u.id = p.user_id
"#;

/// PostgresRepository
///
/// The production implementation of `Repository`, backed by a `PgPool`.
///
/// Queries are built at runtime (`sqlx::query_as` / `QueryBuilder`) so the crate compiles
/// without a live database. Cascades are explicit, ordered DELETE statements inside one
/// transaction, children before parents, rather than relying on `ON DELETE CASCADE`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations in `./migrations`.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

/// Escapes LIKE wildcards so a search term only ever matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn target_columns(target: ReactionTarget) -> (Option<Uuid>, Option<Uuid>) {
    match target {
        ReactionTarget::Post(id) => (Some(id), None),
        ReactionTarget::Comment(id) => (None, Some(id)),
    }
}

/// Advisory lock key for one user's reactions on one target.
fn reaction_lock_key(target: ReactionTarget, user_id: Uuid) -> String {
    match target {
        ReactionTarget::Post(id) => format!("reaction:{}:post:{}", user_id, id),
        ReactionTarget::Comment(id) => format!("reaction:{}:comment:{}", user_id, id),
    }
}

/// Removes the reactions on a set of comments, the comments, and the reactions on a set
/// of posts, in that order. `post_filter` selects the post ids.
async fn delete_post_children(
    tx: &mut Transaction<'_, Postgres>,
    post_filter: &str,
    key: Uuid,
) -> Result<(), sqlx::Error> {
    let reactions = sqlx::query(&format!(
        r#"DELETE FROM reactions
           WHERE post_id IN ({post_filter})
              OR comment_id IN (SELECT id FROM comments WHERE post_id IN ({post_filter}))"#
    ))
    .bind(key)
    .execute(&mut **tx)
    .await?;

    let comments = sqlx::query(&format!(
        "DELETE FROM comments WHERE post_id IN ({post_filter})"
    ))
    .bind(key)
    .execute(&mut **tx)
    .await?;

    tracing::debug!(
        reactions = reactions.rows_affected(),
        comments = comments.rows_affected(),
        "cascade removed post children"
    );
    Ok(())
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    /// create_user
    ///
    /// Role and status take their column defaults ('user', 'active'). Duplicate usernames
    /// or emails surface as `Conflict` through the unique constraints.
    async fn create_user(&self, new_user: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (id, username, email, hashed_password, registration_date)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.hashed_password)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// list_users
    ///
    /// Exact-match filters assembled with `QueryBuilder` so every value is a bound parameter.
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));

        if let Some(username) = &filter.username {
            builder.push(" AND username = ").push_bind(username.clone());
        }
        if let Some(email) = &filter.email {
            builder.push(" AND email = ").push_bind(email.clone());
        }
        if let Some(role) = &filter.role {
            builder.push(" AND role = ").push_bind(role.clone());
        }
        if let Some(status) = &filter.status {
            builder.push(" AND status = ").push_bind(status.clone());
        }
        builder.push(" ORDER BY registration_date ASC");

        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    /// update_user
    ///
    /// Uses `COALESCE` so only the provided fields change.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users
               SET email = COALESCE($2, email),
                   hashed_password = COALESCE($3, hashed_password),
                   avatar = COALESCE($4, avatar)
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.email)
        .bind(changes.hashed_password)
        .bind(changes.avatar)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// delete_user
    ///
    /// Ordered cascade: reactions (by the user, or on the user's posts/comments), comments
    /// (by the user, or on the user's posts), posts, memberships, then the user.
    async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        delete_post_children(&mut tx, "SELECT id FROM posts WHERE user_id = $1", id).await?;

        sqlx::query(
            r#"DELETE FROM reactions
               WHERE user_id = $1
                  OR comment_id IN (SELECT id FROM comments WHERE user_id = $1)"#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM comments WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM posts WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM group_members WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    // --- GROUPS ---

    /// create_group
    ///
    /// The group row and the creator's admin membership commit together.
    async fn create_group(&self, new_group: NewGroup, creator_id: Uuid) -> AppResult<Group> {
        let mut tx = self.pool.begin().await?;

        let group = sqlx::query_as::<_, Group>(&format!(
            r#"INSERT INTO groups (id, name, description, avatar, creation_date, public)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {GROUP_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(new_group.name)
        .bind(new_group.description)
        .bind(new_group.avatar)
        .bind(Utc::now())
        .bind(new_group.public)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(group.id)
            .bind(creator_id)
            .bind(GroupRole::Admin.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(group)
    }

    async fn get_group(&self, id: Uuid) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn get_group_by_name(&self, name: &str) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups WHERE name = $1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    async fn list_groups(&self, limit: i64, offset: i64) -> AppResult<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(&format!(
            "SELECT {GROUP_COLUMNS} FROM groups ORDER BY creation_date ASC, id LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// search_groups
    ///
    /// `ILIKE` substring match; the LEFT JOIN yields the caller's role or NULL.
    async fn search_groups(
        &self,
        pattern: &str,
        user_id: Uuid,
    ) -> AppResult<Vec<GroupMembershipRecord>> {
        let groups = sqlx::query_as::<_, GroupMembershipRecord>(
            r#"SELECT g.id, g.name, g.description, g.avatar, g.creation_date, g.public,
                      gm.role AS member_role
               FROM groups g
               LEFT JOIN group_members gm ON gm.group_id = g.id AND gm.user_id = $2
               WHERE g.name ILIKE $1
               ORDER BY g.name ASC"#,
        )
        .bind(like_pattern(pattern))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn groups_for_user(&self, user_id: Uuid) -> AppResult<Vec<GroupMembershipRecord>> {
        let groups = sqlx::query_as::<_, GroupMembershipRecord>(
            r#"SELECT g.id, g.name, g.description, g.avatar, g.creation_date, g.public,
                      gm.role AS member_role
               FROM group_members gm
               JOIN groups g ON g.id = gm.group_id
               WHERE gm.user_id = $1
               ORDER BY g.name ASC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn update_group(&self, id: Uuid, changes: GroupChanges) -> AppResult<Option<Group>> {
        let group = sqlx::query_as::<_, Group>(&format!(
            r#"UPDATE groups
               SET name = COALESCE($2, name),
                   description = COALESCE($3, description),
                   public = COALESCE($4, public),
                   avatar = COALESCE($5, avatar)
               WHERE id = $1
               RETURNING {GROUP_COLUMNS}"#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.public)
        .bind(changes.avatar)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }

    /// delete_group
    ///
    /// Ordered cascade: reactions and comments under the group's posts, the posts, the
    /// memberships, then the group.
    async fn delete_group(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        delete_post_children(&mut tx, "SELECT id FROM posts WHERE group_id = $1", id).await?;

        sqlx::query("DELETE FROM posts WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM group_members WHERE group_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    // --- MEMBERSHIPS ---

    async fn get_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<Membership>> {
        let membership = sqlx::query_as::<_, Membership>(
            "SELECT group_id, user_id, role FROM group_members WHERE group_id = $1 AND user_id = $2",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(membership)
    }

    /// add_membership
    ///
    /// `ON CONFLICT DO NOTHING` on the composite key makes this idempotent.
    async fn add_membership(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        role: GroupRole,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"INSERT INTO group_members (group_id, user_id, role) VALUES ($1, $2, $3)
               ON CONFLICT (group_id, user_id) DO NOTHING"#,
        )
        .bind(group_id)
        .bind(user_id)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_membership(&self, group_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM group_members WHERE group_id = $1 AND user_id = $2")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_members(&self, group_id: Uuid) -> AppResult<Vec<MemberRecord>> {
        let members = sqlx::query_as::<_, MemberRecord>(
            r#"SELECT u.id, u.username, u.email, u.avatar, u.registration_date,
                      gm.role AS role_in_group
               FROM group_members gm
               JOIN users u ON u.id = gm.user_id
               WHERE gm.group_id = $1
               ORDER BY u.username ASC"#,
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    // --- POSTS ---

    async fn create_post(&self, author_id: Uuid, new_post: NewPost) -> AppResult<Post> {
        let post = sqlx::query_as::<_, Post>(&format!(
            r#"INSERT INTO posts (id, group_id, user_id, content, image, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {POST_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(new_post.group_id)
        .bind(author_id)
        .bind(new_post.content)
        .bind(new_post.image)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post(&self, id: Uuid) -> AppResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post_record(&self, id: Uuid) -> AppResult<Option<PostRecord>> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "{POST_RECORD_SELECT} WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_posts(&self, scope: PostScope) -> AppResult<Vec<PostRecord>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_RECORD_SELECT);

        match scope {
            PostScope::Author(user_id) => {
                builder.push(" WHERE p.user_id = ").push_bind(user_id);
            }
            PostScope::Group(group_id) => {
                builder.push(" WHERE p.group_id = ").push_bind(group_id);
            }
            PostScope::All => {}
        }
        builder.push(" ORDER BY p.created_at DESC");

        let posts = builder
            .build_query_as::<PostRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn update_post_content(&self, id: Uuid, content: String) -> AppResult<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "UPDATE posts SET content = $2 WHERE id = $1 RETURNING {POST_COLUMNS}"
        ))
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn delete_post(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        delete_post_children(&mut tx, "SELECT $1::uuid", id).await?;

        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn create_comment(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        text: String,
    ) -> AppResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            r#"INSERT INTO comments (id, post_id, user_id, text, created_at)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {COMMENT_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comment(&self, id: Uuid) -> AppResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn list_comments(&self, post_id: Uuid) -> AppResult<Vec<CommentRecord>> {
        let comments = sqlx::query_as::<_, CommentRecord>(
            r#"SELECT c.id, c.post_id, c.user_id, c.text, c.created_at,
                      u.username AS author_username, u.avatar AS author_avatar
               FROM comments c
               JOIN users u ON u.id = c.user_id
               WHERE c.post_id = $1
               ORDER BY c.created_at ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn delete_comment(&self, id: Uuid) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM reactions WHERE comment_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() > 0)
    }

    // --- REACTIONS ---

    /// toggle_reaction
    ///
    /// Runs inside one transaction holding an advisory lock on (user, target), so toggles
    /// by the same user on the same post or comment are applied one at a time.
    async fn toggle_reaction(
        &self,
        target: ReactionTarget,
        user_id: Uuid,
        reaction_type: &str,
    ) -> AppResult<ReactionToggle> {
        let (post_id, comment_id) = target_columns(target);
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(reaction_lock_key(target, user_id))
            .execute(&mut *tx)
            .await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"SELECT id FROM reactions
               WHERE user_id = $1
                 AND post_id IS NOT DISTINCT FROM $2
                 AND comment_id IS NOT DISTINCT FROM $3
                 AND type = $4
               FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(post_id)
        .bind(comment_id)
        .bind(reaction_type)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(existing_id) = existing {
            sqlx::query("DELETE FROM reactions WHERE id = $1")
                .bind(existing_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok(ReactionToggle::Removed);
        }

        if let Some(opposite) = policy::opposite_reaction(reaction_type) {
            sqlx::query(
                r#"DELETE FROM reactions
                   WHERE user_id = $1
                     AND post_id IS NOT DISTINCT FROM $2
                     AND comment_id IS NOT DISTINCT FROM $3
                     AND type = $4"#,
            )
            .bind(user_id)
            .bind(post_id)
            .bind(comment_id)
            .bind(opposite)
            .execute(&mut *tx)
            .await?;
        }

        let reaction = sqlx::query_as::<_, Reaction>(&format!(
            r#"INSERT INTO reactions (id, post_id, comment_id, user_id, type, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {REACTION_COLUMNS}"#
        ))
        .bind(Uuid::new_v4())
        .bind(post_id)
        .bind(comment_id)
        .bind(user_id)
        .bind(reaction_type)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ReactionToggle::Added(reaction))
    }

    async fn get_reaction(&self, id: Uuid) -> AppResult<Option<Reaction>> {
        let reaction = sqlx::query_as::<_, Reaction>(&format!(
            "SELECT {REACTION_COLUMNS} FROM reactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(reaction)
    }

    async fn list_reactions(&self, post_id: Uuid) -> AppResult<Vec<ReactionRecord>> {
        let reactions = sqlx::query_as::<_, ReactionRecord>(
            r#"SELECT r.id, r.post_id, r.comment_id, r.user_id, r.type, r.created_at,
                      u.username AS author_username, u.avatar AS author_avatar
               FROM reactions r
               JOIN users u ON u.id = r.user_id
               WHERE r.post_id = $1
                  OR r.comment_id IN (SELECT id FROM comments WHERE post_id = $1)
               ORDER BY r.created_at ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reactions)
    }

    async fn delete_reaction(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM reactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
