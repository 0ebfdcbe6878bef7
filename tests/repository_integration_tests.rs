//! PostgreSQL repository tests.
//!
//! These need a live database: set `DATABASE_URL` and run
//! `cargo test --test repository_integration_tests -- --ignored`.

use social_hub::{
    AppError,
    models::{
        GroupChanges, GroupRole, NewGroup, NewPost, NewUser, PostScope, ReactionTarget,
        ReactionToggle, User, UserChanges, UserFilter,
    },
    repository::{PostgresRepository, Repository},
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::test;
use uuid::Uuid;

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Names are suffixed so repeated runs against the same database never collide.
fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

async fn create_test_user(repo: &PostgresRepository) -> User {
    let username = unique("user");
    repo.create_user(NewUser {
        email: format!("{}@test.com", username),
        username,
        hashed_password: "$argon2id$placeholder".to_string(),
    })
    .await
    .expect("user insert")
}

fn new_group() -> NewGroup {
    NewGroup {
        name: unique("group"),
        description: "integration".to_string(),
        public: true,
        avatar: Some(vec![1, 2, 3]),
    }
}

async fn create_test_post(repo: &PostgresRepository, group_id: Uuid, author: Uuid) -> Uuid {
    repo.create_post(
        author,
        NewPost {
            group_id,
            content: "hello from postgres".to_string(),
            image: None,
        },
    )
    .await
    .expect("post insert")
    .id
}

// --- Tests ---

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_uniqueness_maps_to_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let duplicate = repo
        .create_user(NewUser {
            username: user.username.clone(),
            email: format!("{}@other.com", Uuid::new_v4()),
            hashed_password: "x".to_string(),
        })
        .await;

    assert_eq!(
        duplicate.unwrap_err(),
        AppError::Conflict("Username is already taken".to_string())
    );
    assert_eq!(user.role, "user");
    assert_eq!(user.status, "active");
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_update_and_filter_users() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;

    let updated = repo
        .update_user(
            user.id,
            UserChanges {
                avatar: Some(vec![9, 9]),
                ..UserChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.email, user.email);
    assert_eq!(updated.avatar, Some(vec![9, 9]));

    let found = repo
        .list_users(&UserFilter {
            username: Some(user.username.clone()),
            ..UserFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(
        repo.update_user(Uuid::new_v4(), UserChanges::default())
            .await
            .unwrap()
            .is_none()
    );
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_group_creation_membership_and_update() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let member = create_test_user(&repo).await;

    let group = repo.create_group(new_group(), owner.id).await.unwrap();
    let admin = repo.get_membership(group.id, owner.id).await.unwrap().unwrap();
    assert_eq!(admin.group_role(), GroupRole::Admin);

    assert!(repo.add_membership(group.id, member.id, GroupRole::User).await.unwrap());
    assert!(!repo.add_membership(group.id, member.id, GroupRole::User).await.unwrap());
    assert_eq!(repo.list_members(group.id).await.unwrap().len(), 2);

    let updated = repo
        .update_group(
            group.id,
            GroupChanges {
                public: Some(false),
                ..GroupChanges::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!updated.public);
    assert_eq!(updated.name, group.name);

    let search_term = group.name.to_uppercase();
    let found = repo.search_groups(&search_term, member.id).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].member_role.as_deref(), Some("user"));
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_reaction_toggle_in_transaction() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let group = repo.create_group(new_group(), owner.id).await.unwrap();
    let post_id = create_test_post(&repo, group.id, owner.id).await;
    let target = ReactionTarget::Post(post_id);

    assert!(matches!(
        repo.toggle_reaction(target, owner.id, "like").await.unwrap(),
        ReactionToggle::Added(_)
    ));
    assert!(matches!(
        repo.toggle_reaction(target, owner.id, "dislike").await.unwrap(),
        ReactionToggle::Added(_)
    ));
    let reactions = repo.list_reactions(post_id).await.unwrap();
    assert_eq!(reactions.len(), 1);
    assert_eq!(reactions[0].reaction.reaction_type, "dislike");

    assert!(matches!(
        repo.toggle_reaction(target, owner.id, "dislike").await.unwrap(),
        ReactionToggle::Removed
    ));
    assert!(repo.list_reactions(post_id).await.unwrap().is_empty());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_toggles_keep_like_and_dislike_exclusive() {
    let ctx = DbTestContext::setup().await;
    let repo = Arc::new(ctx.repository());
    let owner = create_test_user(&repo).await;
    let group = repo.create_group(new_group(), owner.id).await.unwrap();
    let user_id = owner.id;

    for _ in 0..50 {
        let post_id = create_test_post(&repo, group.id, owner.id).await;
        let target = ReactionTarget::Post(post_id);

        let like = tokio::spawn({
            let repo = repo.clone();
            async move { repo.toggle_reaction(target, user_id, "like").await }
        });
        let dislike = tokio::spawn({
            let repo = repo.clone();
            async move { repo.toggle_reaction(target, user_id, "dislike").await }
        });
        assert!(matches!(like.await.unwrap(), Ok(ReactionToggle::Added(_))));
        assert!(matches!(dislike.await.unwrap(), Ok(ReactionToggle::Added(_))));

        assert_eq!(repo.list_reactions(post_id).await.unwrap().len(), 1);
    }
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_identical_toggles_cancel_out() {
    let ctx = DbTestContext::setup().await;
    let repo = Arc::new(ctx.repository());
    let owner = create_test_user(&repo).await;
    let group = repo.create_group(new_group(), owner.id).await.unwrap();
    let post_id = create_test_post(&repo, group.id, owner.id).await;
    let target = ReactionTarget::Post(post_id);
    let user_id = owner.id;

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.toggle_reaction(target, user_id, "like").await })
        })
        .collect();
    for task in tasks {
        assert!(task.await.unwrap().is_ok());
    }

    assert!(repo.list_reactions(post_id).await.unwrap().is_empty());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_group_delete_cascades() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let group = repo.create_group(new_group(), owner.id).await.unwrap();
    let post_id = create_test_post(&repo, group.id, owner.id).await;
    let comment = repo
        .create_comment(post_id, owner.id, "first".to_string())
        .await
        .unwrap();
    repo.toggle_reaction(ReactionTarget::Comment(comment.id), owner.id, "like")
        .await
        .unwrap();

    assert!(repo.delete_group(group.id).await.unwrap());

    assert!(repo.get_post(post_id).await.unwrap().is_none());
    assert!(repo.get_comment(comment.id).await.unwrap().is_none());
    assert!(
        repo.get_membership(group.id, owner.id)
            .await
            .unwrap()
            .is_none()
    );
    let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reactions WHERE comment_id = $1")
        .bind(comment.id)
        .fetch_one(&ctx.pool)
        .await
        .unwrap();
    assert_eq!(orphans, 0);
    assert!(!repo.delete_group(group.id).await.unwrap());
}

#[test]
#[ignore = "requires DATABASE_URL"]
async fn test_user_delete_cascades_and_post_scopes() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let owner = create_test_user(&repo).await;
    let author = create_test_user(&repo).await;
    let group = repo.create_group(new_group(), owner.id).await.unwrap();
    repo.add_membership(group.id, author.id, GroupRole::User)
        .await
        .unwrap();
    let post_id = create_test_post(&repo, group.id, author.id).await;

    let by_author = repo.list_posts(PostScope::Author(author.id)).await.unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].author_username, author.username);

    assert!(repo.delete_user(author.id).await.unwrap());
    assert!(repo.get_post(post_id).await.unwrap().is_none());
    assert!(
        repo.get_membership(group.id, author.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(repo.list_posts(PostScope::Group(group.id)).await.unwrap().is_empty());
}
