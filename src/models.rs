use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::AppError, media};

// --- Role Axes ---

/// AccountRole
///
/// The global role stored on the user record. Independent of any per-group role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum AccountRole {
    Admin,
    #[default]
    User,
}

/// GroupRole
///
/// The role a user holds inside one group, stored on the membership row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum GroupRole {
    Admin,
    #[default]
    User,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::Admin => "admin",
            AccountRole::User => "user",
        }
    }
}

impl FromStr for AccountRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AccountRole::Admin),
            "user" => Ok(AccountRole::User),
            other => Err(AppError::BadRequest(format!("Unknown role '{}'", other))),
        }
    }
}

impl GroupRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Admin => "admin",
            GroupRole::User => "user",
        }
    }
}

impl FromStr for GroupRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(GroupRole::Admin),
            "user" => Ok(GroupRole::User),
            other => Err(AppError::BadRequest(format!(
                "Unknown group role '{}'",
                other
            ))),
        }
    }
}

// --- Core Rows (Mapped to Database) ---

/// User
///
/// A row of the `users` table. Never serialized directly: `UserView` is the outward shape
/// and drops the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub hashed_password: String,
    pub avatar: Option<Vec<u8>>,
    pub registration_date: DateTime<Utc>,
    pub role: String,
    pub status: String,
}

impl User {
    /// Unknown stored values degrade to the least privileged role.
    pub fn account_role(&self) -> AccountRole {
        self.role.parse().unwrap_or(AccountRole::User)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub avatar: Option<Vec<u8>>,
    pub creation_date: DateTime<Utc>,
    pub public: bool,
}

/// Membership
///
/// A row of `group_members`, keyed by (group_id, user_id).
#[derive(Debug, Clone, FromRow)]
pub struct Membership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

impl Membership {
    pub fn group_role(&self) -> GroupRole {
        self.role.parse().unwrap_or(GroupRole::User)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub image: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Reaction
///
/// Exactly one of `post_id` / `comment_id` is set (enforced by a CHECK constraint).
#[derive(Debug, Clone, FromRow)]
pub struct Reaction {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub user_id: Uuid,
    // 'type' is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    pub reaction_type: String,
    pub created_at: DateTime<Utc>,
}

impl Reaction {
    pub fn target(&self) -> Option<ReactionTarget> {
        match (self.post_id, self.comment_id) {
            (Some(post_id), None) => Some(ReactionTarget::Post(post_id)),
            (None, Some(comment_id)) => Some(ReactionTarget::Comment(comment_id)),
            _ => None,
        }
    }
}

// --- Joined Records (Read Model Inputs) ---

/// PostRecord
///
/// A post joined with its author's summary columns.
#[derive(Debug, Clone, FromRow)]
pub struct PostRecord {
    #[sqlx(flatten)]
    pub post: Post,
    pub author_username: String,
    pub author_avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct CommentRecord {
    #[sqlx(flatten)]
    pub comment: Comment,
    pub author_username: String,
    pub author_avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReactionRecord {
    #[sqlx(flatten)]
    pub reaction: Reaction,
    pub author_username: String,
    pub author_avatar: Option<Vec<u8>>,
}

/// MemberRecord
///
/// A user joined with the role they hold in one group.
#[derive(Debug, Clone, FromRow)]
pub struct MemberRecord {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<Vec<u8>>,
    pub registration_date: DateTime<Utc>,
    pub role_in_group: String,
}

/// GroupMembershipRecord
///
/// A group annotated with the querying user's membership role, `None` when not a member.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMembershipRecord {
    #[sqlx(flatten)]
    pub group: Group,
    pub member_role: Option<String>,
}

// --- Domain Inputs ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub hashed_password: String,
}

/// UserChanges
///
/// Partial update applied by the repository; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub hashed_password: Option<String>,
    pub avatar: Option<Vec<u8>>,
}

/// UserUpdate
///
/// Caller-facing partial update. The password is raw here and hashed by the service.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub name: String,
    pub description: String,
    pub public: bool,
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct GroupChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub public: Option<bool>,
    pub avatar: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub group_id: Uuid,
    pub content: String,
    pub image: Option<Vec<u8>>,
}

/// Which posts a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    Author(Uuid),
    Group(Uuid),
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionTarget {
    Post(Uuid),
    Comment(Uuid),
}

/// Result of the reaction toggle.
#[derive(Debug, Clone)]
pub enum ReactionToggle {
    Added(Reaction),
    Removed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
}

/// UserFilter
///
/// Admin listing filters; every provided field must match exactly.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct UserFilter {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for `POST /user/register`. The password is hashed before it reaches the
/// repository and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginForm
///
/// Form-encoded credentials for `POST /user/login`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EditPostRequest {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReactionRequest {
    pub reaction_type: String,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, utoipa::IntoParams)]
pub struct GroupSearchQuery {
    pub name: String,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub username: String,
}

/// UserView
///
/// Public shape of a user. The avatar is a base64 data-URI.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub registration_date: DateTime<Utc>,
    pub role: String,
    pub status: String,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        UserView {
            id: user.id,
            username: user.username,
            email: user.email,
            avatar: media::optional_data_uri(user.avatar.as_deref()),
            registration_date: user.registration_date,
            role: user.role,
            status: user.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GroupView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub creation_date: DateTime<Utc>,
    pub public: bool,
}

impl From<Group> for GroupView {
    fn from(group: Group) -> Self {
        GroupView {
            id: group.id,
            name: group.name,
            description: group.description,
            avatar: media::optional_data_uri(group.avatar.as_deref()),
            creation_date: group.creation_date,
            public: group.public,
        }
    }
}

/// GroupMembershipView
///
/// A group as seen by one caller: search results and "my groups" listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct GroupMembershipView {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub creation_date: DateTime<Utc>,
    pub public: bool,
    pub is_member: bool,
    pub role: Option<GroupRole>,
}

impl From<GroupMembershipRecord> for GroupMembershipView {
    fn from(record: GroupMembershipRecord) -> Self {
        let role = record
            .member_role
            .as_deref()
            .map(|r| r.parse().unwrap_or(GroupRole::User));
        let group = record.group;
        GroupMembershipView {
            id: group.id,
            name: group.name,
            description: group.description,
            avatar: media::optional_data_uri(group.avatar.as_deref()),
            creation_date: group.creation_date,
            public: group.public,
            is_member: role.is_some(),
            role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MemberView {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub avatar: Option<String>,
    #[ts(type = "string")]
    pub registration_date: DateTime<Utc>,
    pub role_in_group: GroupRole,
}

impl From<MemberRecord> for MemberView {
    fn from(record: MemberRecord) -> Self {
        MemberView {
            id: record.id,
            username: record.username,
            email: record.email,
            avatar: media::optional_data_uri(record.avatar.as_deref()),
            registration_date: record.registration_date,
            role_in_group: record.role_in_group.parse().unwrap_or(GroupRole::User),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct JoinResponse {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub status: JoinOutcome,
}

/// AuthorSummary
///
/// The denormalized author block embedded in posts, comments and reactions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AuthorSummary {
    pub id: Uuid,
    pub username: String,
    pub avatar: Option<String>,
}

impl AuthorSummary {
    fn new(id: Uuid, username: String, avatar: Option<&[u8]>) -> Self {
        AuthorSummary {
            id,
            username,
            avatar: media::optional_data_uri(avatar),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostView {
    pub id: Uuid,
    pub group_id: Uuid,
    pub content: String,
    pub image: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
}

impl From<PostRecord> for PostView {
    fn from(record: PostRecord) -> Self {
        let post = record.post;
        PostView {
            id: post.id,
            group_id: post.group_id,
            content: post.content,
            image: media::optional_data_uri(post.image.as_deref()),
            created_at: post.created_at,
            author: AuthorSummary::new(
                post.user_id,
                record.author_username,
                record.author_avatar.as_deref(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReactionView {
    pub id: Uuid,
    pub post_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub reaction_type: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
}

impl From<ReactionRecord> for ReactionView {
    fn from(record: ReactionRecord) -> Self {
        let reaction = record.reaction;
        ReactionView {
            id: reaction.id,
            post_id: reaction.post_id,
            comment_id: reaction.comment_id,
            reaction_type: reaction.reaction_type,
            created_at: reaction.created_at,
            author: AuthorSummary::new(
                reaction.user_id,
                record.author_username,
                record.author_avatar.as_deref(),
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
    pub reactions: Vec<ReactionView>,
}

impl CommentView {
    pub fn new(record: CommentRecord, reactions: Vec<ReactionView>) -> Self {
        let comment = record.comment;
        CommentView {
            id: comment.id,
            post_id: comment.post_id,
            text: comment.text,
            created_at: comment.created_at,
            author: AuthorSummary::new(
                comment.user_id,
                record.author_username,
                record.author_avatar.as_deref(),
            ),
            reactions,
        }
    }
}

/// PostDetail
///
/// A post with its full discussion: comments (each with their own reactions) and the
/// reactions that target the post itself.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostDetail {
    pub post: PostView,
    pub comments: Vec<CommentView>,
    pub reactions: Vec<ReactionView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ReactionStatus {
    Added,
    Removed,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ReactionResponse {
    pub status: ReactionStatus,
    pub reaction: Option<ReactionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        MessageResponse {
            message: message.into(),
        }
    }
}
