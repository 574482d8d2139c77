//! Runs against a real Postgres. `cargo test -- --ignored` with `DATABASE_URL` set.

use blog_api::{
    access::Role,
    models::{NewCategory, NewComment, NewPost, NewUser, UpdatePostRequest, User},
    repository::{Constraint, PostQuery, PostgresRepository, RepoError, Repository},
    slug::{self, SlugScope},
};
use sqlx::PgPool;
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

/// Every run gets its own names so tests can share one database.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", &Uuid::new_v4().simple().to_string()[..12])
}

async fn create_test_user(repo: &PostgresRepository, role: Role) -> User {
    let username = unique("user");
    repo.create_user(NewUser {
        email: format!("{username}@test.com"),
        username,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        password_hash: "not-a-real-hash".to_string(),
        role,
    })
    .await
    .expect("Failed to create test user")
}

async fn create_test_category(repo: &PostgresRepository) -> i64 {
    let name = unique("cat");
    repo.create_category(NewCategory {
        slug: name.clone(),
        name,
    })
    .await
    .expect("Failed to create test category")
    .id
}

fn new_post(author: Uuid, category: i64, title: &str, slug: &str, published: bool) -> NewPost {
    NewPost {
        title: title.to_string(),
        slug: slug.to_string(),
        author_id: author,
        category_id: category,
        content: "content".to_string(),
        published,
    }
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_unique_constraints_surface_as_typed_conflicts() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;
    let category = create_test_category(&repo).await;

    let duplicate = repo
        .create_user(NewUser {
            username: user.username.clone(),
            email: unique("other") + "@test.com",
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "x".to_string(),
            role: Role::User,
        })
        .await;
    assert!(matches!(
        duplicate,
        Err(RepoError::UniqueViolation(Constraint::Username))
    ));

    let slug = unique("post");
    repo.insert_post(new_post(user.id, category, "One", &slug, true))
        .await
        .unwrap();
    let clash = repo
        .insert_post(new_post(user.id, category, "Two", &slug, true))
        .await;
    assert!(matches!(
        clash,
        Err(RepoError::UniqueViolation(Constraint::PostSlug))
    ));

    let orphan = repo
        .insert_post(new_post(user.id, i64::MAX, "Three", &unique("post"), true))
        .await;
    assert!(matches!(orphan, Err(RepoError::MissingReference(_))));
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_role_column_round_trips() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();

    let admin = create_test_user(&repo, Role::Admin).await;
    let fetched = repo.get_user(admin.id).await.unwrap().unwrap();
    assert_eq!(Role::from_column(fetched.role.as_deref()), Role::Admin);

    sqlx::query("UPDATE users SET role = NULL WHERE id = $1")
        .bind(admin.id)
        .execute(&ctx.pool)
        .await
        .unwrap();
    let demoted = repo.get_user(admin.id).await.unwrap().unwrap();
    assert_eq!(Role::from_column(demoted.role.as_deref()), Role::User);
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_slug_assignment_against_postgres() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;
    let category = create_test_category(&repo).await;
    let title = unique("Same Title");

    let mut slugs = Vec::new();
    for _ in 0..3 {
        let post = slug::insert_with_unique_slug(&repo, SlugScope::Post, &title, |slug| {
            repo.insert_post(new_post(user.id, category, &title, &slug, true))
        })
        .await
        .unwrap();
        slugs.push(post.slug);
    }

    let base = slug::slugify(&title, 200);
    assert_eq!(slugs, vec![base.clone(), format!("{base}-1"), format!("{base}-2")]);
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_post_views_filters_and_counts() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;
    let category = create_test_category(&repo).await;
    let marker = unique("needle");

    let visible = repo
        .insert_post(new_post(user.id, category, &format!("{marker} live"), &unique("p"), true))
        .await
        .unwrap();
    repo.insert_post(new_post(user.id, category, &format!("{marker} draft"), &unique("p"), false))
        .await
        .unwrap();

    repo.insert_like(visible.id, user.id).await.unwrap();
    repo.insert_comment(NewComment {
        post_id: visible.id,
        user_id: user.id,
        body: "hello".to_string(),
    })
    .await
    .unwrap();

    let found = repo
        .list_posts(PostQuery {
            published_only: true,
            search: Some(marker.to_uppercase()),
            ..PostQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, visible.id);
    assert_eq!(found[0].likes_count, 1);
    assert_eq!(found[0].comments_count, 1);
    assert_eq!(found[0].author_username, user.username);

    let mine = repo
        .list_posts(PostQuery {
            author_id: Some(user.id),
            ..PostQuery::default()
        })
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_like_pair_is_unique_and_delete_reports_removal() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;
    let category = create_test_category(&repo).await;
    let post = repo
        .insert_post(new_post(user.id, category, "Likes", &unique("p"), true))
        .await
        .unwrap();

    repo.insert_like(post.id, user.id).await.unwrap();
    assert!(matches!(
        repo.insert_like(post.id, user.id).await,
        Err(RepoError::UniqueViolation(Constraint::LikePair))
    ));
    assert!(repo.delete_like(post.id, user.id).await.unwrap());
    assert!(!repo.delete_like(post.id, user.id).await.unwrap());
}

#[tokio::test]
#[ignore = "requires a Postgres DATABASE_URL"]
async fn test_update_post_is_partial_and_comments_soft_delete() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo, Role::User).await;
    let category = create_test_category(&repo).await;
    let slug = unique("p");
    let post = repo
        .insert_post(new_post(user.id, category, "Before", &slug, false))
        .await
        .unwrap();

    let updated = repo
        .update_post(
            post.id,
            UpdatePostRequest {
                title: Some("After".to_string()),
                ..UpdatePostRequest::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "After");
    assert_eq!(updated.slug, slug);
    assert!(!updated.published);
    assert!(updated.updated_at >= post.updated_at);

    let comment = repo
        .insert_comment(NewComment {
            post_id: post.id,
            user_id: user.id,
            body: "bye".to_string(),
        })
        .await
        .unwrap();
    assert!(repo.deactivate_comment(comment.id).await.unwrap());
    assert!(repo.get_comment(comment.id).await.unwrap().is_none());
    assert!(repo.list_comments(post.id).await.unwrap().is_empty());
    assert!(!repo.deactivate_comment(comment.id).await.unwrap());
}
