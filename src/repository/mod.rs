use std::{fmt, sync::Arc};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    models::{
        Category, Comment, CommentView, NewCategory, NewComment, NewPost, NewUser, Post,
        PostView, UpdateCategoryRequest, UpdatePostRequest, User,
    },
    slug::SlugScope,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// Constraint
///
/// The uniqueness constraints the store is required to enforce. Slug assignment and the
/// like toggle branch on these, so every backend must report violations with them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Username,
    Email,
    CategoryName,
    CategorySlug,
    PostSlug,
    LikePair,
    Other(String),
}

impl Constraint {
    /// Maps a Postgres constraint name (see `migrations/`) to its variant.
    pub fn from_name(name: &str) -> Self {
        match name {
            "users_username_key" => Constraint::Username,
            "users_email_key" => Constraint::Email,
            "categories_name_key" => Constraint::CategoryName,
            "categories_slug_key" => Constraint::CategorySlug,
            "posts_slug_key" => Constraint::PostSlug,
            "likes_post_user_key" => Constraint::LikePair,
            other => Constraint::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Username => f.write_str("username"),
            Constraint::Email => f.write_str("email"),
            Constraint::CategoryName => f.write_str("category name"),
            Constraint::CategorySlug => f.write_str("category slug"),
            Constraint::PostSlug => f.write_str("post slug"),
            Constraint::LikePair => f.write_str("like"),
            Constraint::Other(name) => f.write_str(name),
        }
    }
}

/// RepoError
///
/// Store failures, with the two constraint classes callers recover from kept apart from
/// everything else.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("unique constraint violated: {0}")]
    UniqueViolation(Constraint),

    #[error("referenced row does not exist: {0}")]
    MissingReference(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or_default().to_string();
            if db.is_unique_violation() {
                return RepoError::UniqueViolation(Constraint::from_name(&constraint));
            }
            if db.is_foreign_key_violation() {
                return RepoError::MissingReference(constraint);
            }
        }
        RepoError::Database(err)
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// PostOrdering
///
/// Accepted values of the `ordering` query parameter on post listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostOrdering {
    #[default]
    NewestFirst,
    OldestFirst,
    RecentlyUpdated,
    LeastRecentlyUpdated,
}

impl PostOrdering {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "-created_at" => Some(PostOrdering::NewestFirst),
            "created_at" => Some(PostOrdering::OldestFirst),
            "-updated_at" => Some(PostOrdering::RecentlyUpdated),
            "updated_at" => Some(PostOrdering::LeastRecentlyUpdated),
            _ => None,
        }
    }

    pub(crate) fn sql(&self) -> &'static str {
        match self {
            PostOrdering::NewestFirst => " ORDER BY p.created_at DESC, p.id DESC",
            PostOrdering::OldestFirst => " ORDER BY p.created_at ASC, p.id ASC",
            PostOrdering::RecentlyUpdated => " ORDER BY p.updated_at DESC, p.id DESC",
            PostOrdering::LeastRecentlyUpdated => " ORDER BY p.updated_at ASC, p.id ASC",
        }
    }
}

/// PostQuery
///
/// One filter shape for every post listing (public list, latest, mine, per category).
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub published_only: bool,
    pub author_id: Option<Uuid>,
    pub category_id: Option<i64>,
    /// Case-insensitive substring over title, content, category name and author username.
    pub search: Option<String>,
    pub ordering: PostOrdering,
    pub limit: Option<i64>,
}

/// Repository Trait
///
/// The persistence contract. Handlers and the content policies only see this trait, so
/// Postgres and the in-memory store are interchangeable behind `RepositoryState`.
///
/// Implementations must enforce the unique constraints listed in `Constraint` at write time
/// and report them as `RepoError::UniqueViolation`.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<User>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;

    // --- Slugs ---
    async fn slug_exists(&self, scope: SlugScope, slug: &str) -> RepoResult<bool>;

    // --- Categories ---
    async fn list_categories(&self) -> RepoResult<Vec<Category>>;
    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>>;
    async fn create_category(&self, category: NewCategory) -> RepoResult<Category>;
    async fn update_category(
        &self,
        id: i64,
        changes: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>>;
    // Posts in the category keep existing with `category_id = NULL`.
    async fn delete_category(&self, id: i64) -> RepoResult<bool>;

    // --- Posts ---
    async fn list_posts(&self, query: PostQuery) -> RepoResult<Vec<PostView>>;
    async fn get_post(&self, id: i64) -> RepoResult<Option<Post>>;
    async fn get_post_view(&self, id: i64) -> RepoResult<Option<PostView>>;
    async fn get_post_view_by_slug(&self, slug: &str) -> RepoResult<Option<PostView>>;
    async fn insert_post(&self, post: NewPost) -> RepoResult<Post>;
    // Never touches `slug` or `author_id`.
    async fn update_post(&self, id: i64, changes: UpdatePostRequest) -> RepoResult<Option<Post>>;
    // Cascades to comments and likes.
    async fn delete_post(&self, id: i64) -> RepoResult<bool>;

    // --- Comments (active only unless stated otherwise) ---
    async fn list_comments(&self, post_id: i64) -> RepoResult<Vec<CommentView>>;
    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>>;
    async fn get_comment_view(&self, id: i64) -> RepoResult<Option<CommentView>>;
    async fn insert_comment(&self, comment: NewComment) -> RepoResult<CommentView>;
    async fn update_comment(&self, id: i64, body: String) -> RepoResult<Option<CommentView>>;
    async fn deactivate_comment(&self, id: i64) -> RepoResult<bool>;

    // --- Likes ---
    // Fails with `UniqueViolation(Constraint::LikePair)` if the pair already exists.
    async fn insert_like(&self, post_id: i64, user_id: Uuid) -> RepoResult<()>;
    async fn delete_like(&self, post_id: i64, user_id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;
