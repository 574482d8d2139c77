use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::access::Role;

/// Rejects strings that are empty once surrounding whitespace is removed. Handlers store the
/// trimmed value, so a whitespace-only field would otherwise land as `""`.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank").with_message("This field may not be blank.".into()))
    } else {
        Ok(())
    }
}

// --- Core Records (Mapped to Database) ---

/// User
///
/// The canonical account row from the `users` table. Carries the password hash, so it is
/// never serialized back to clients; handlers answer with `UserSummary` or `UserProfile`.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    // Nullable on purpose: a missing role resolves to a non-privileged principal.
    pub role: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Category
///
/// A named, slugged grouping of posts. Both `name` and `slug` are globally unique.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

/// Post
///
/// A blog post row. `slug` is assigned once at creation and `author_id` never changes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub category_id: Option<i64>,
    pub content: String,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Comment
///
/// A comment row. `active = false` is a soft delete; inactive comments are invisible to
/// every read path.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Uuid,
    pub body: String,
    pub active: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Like
///
/// One row per (post, user) pair in the `likes` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Like {
    pub post_id: i64,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

// --- Read Models (Output Schemas) ---

/// UserSummary
///
/// Public projection of a user, nested into registration and login responses.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// UserProfile
///
/// Output schema for `GET /me`, including the resolved privilege level.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: UserSummary,
    pub role: Role,
    pub is_privileged: bool,
}

/// PostView
///
/// A post joined with its author, category and counters. Used by every listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    // Active comments only.
    pub comments_count: i64,
    pub likes_count: i64,
}

/// CommentView
///
/// An active comment joined with its author's username.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub user_id: Uuid,
    pub username: String,
    pub body: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// PostDetail
///
/// Single-post response: the post view plus its active comments, oldest first.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: PostView,
    pub comments: Vec<CommentView>,
}

/// CategoryDetail
///
/// Public category page: the category and its published posts.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CategoryDetail {
    #[serde(flatten)]
    pub category: Category,
    pub posts: Vec<PostView>,
}

// --- Request Payloads (Input Schemas) ---
//
// Payloads default every field so that missing fields reach `validate()` and are reported
// together, instead of failing JSON deserialization on the first one.

/// RegisterUserRequest
///
/// Input payload for `POST /register`. The password is hashed before it reaches the store.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct RegisterUserRequest {
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1 to 150 characters."),
        custom(function = "not_blank")
    )]
    pub username: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters."))]
    pub password: String,
    #[validate(length(max = 150))]
    pub first_name: String,
    #[validate(length(max = 150))]
    pub last_name: String,
}

/// LoginRequest
///
/// `login` accepts either the email address or the username.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field is required."), custom(function = "not_blank"))]
    pub login: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

/// LoginResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginResponse {
    pub access: String,
    pub refresh: String,
    pub user: UserSummary,
}

/// RefreshRequest
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate, Default)]
#[serde(default)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub refresh: String,
}

/// RefreshResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RefreshResponse {
    pub access: String,
}

/// CreateCategoryRequest
///
/// `slug` is optional; when absent one is derived from `name`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1 to 100 characters."),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(length(min = 1, max = 120, message = "Slug must be 1 to 120 characters."))]
    pub slug: Option<String>,
}

/// UpdateCategoryRequest
///
/// Partial update for `PUT /admin/categories/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdateCategoryRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1 to 100 characters."),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 120, message = "Slug must be 1 to 120 characters."))]
    pub slug: Option<String>,
}

/// CreatePostRequest
///
/// Input payload for `POST /posts`. The author and slug are never taken from the client.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreatePostRequest {
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1 to 255 characters."),
        custom(function = "not_blank")
    )]
    pub title: String,
    #[validate(length(min = 1, message = "This field is required."), custom(function = "not_blank"))]
    pub content: String,
    #[validate(required(message = "This field is required."))]
    pub category_id: Option<i64>,
    pub published: Option<bool>,
}

/// UpdatePostRequest
///
/// Partial update for `PUT /posts/{id}`. There is deliberately no `slug` field.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdatePostRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(
        length(min = 1, max = 255, message = "Title must be 1 to 255 characters."),
        custom(function = "not_blank")
    )]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, message = "Content may not be blank."), custom(function = "not_blank"))]
    pub content: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
}

/// CreateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, message = "This field is required."), custom(function = "not_blank"))]
    pub body: String,
}

/// UpdateCommentRequest
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Validate, Default)]
#[serde(default)]
#[ts(export)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1, message = "This field is required."), custom(function = "not_blank"))]
    pub body: String,
}

/// LikeToggleResponse
///
/// `{"message": "liked"}` or `{"message": "unliked"}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LikeToggleResponse {
    pub message: crate::likes::LikeOutcome,
}

// --- Insert Records (Repository Input) ---

/// NewUser
///
/// Fully prepared account row; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub role: Role,
}

/// NewCategory
#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
}

/// NewPost
///
/// Post ready for insertion. The slug comes from slug assignment, never from the client.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub slug: String,
    pub author_id: Uuid,
    pub category_id: i64,
    pub content: String,
    pub published: bool,
}

/// NewComment
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: Uuid,
    pub body: String,
}
