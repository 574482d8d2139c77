use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    AppState,
    access::{Action, authorize},
    auth::AuthUser,
    error::AppError,
    extract::ApiJson,
    models::{CreatePostRequest, NewPost, Post, PostDetail, PostView, UpdatePostRequest},
    repository::{PostOrdering, PostQuery, RepoError},
    slug::{self, SlugScope},
};

const LATEST_POSTS: i64 = 5;
const INVALID_CATEGORY: &str = "Invalid category ID";

/// PostFilter
///
/// Query parameters accepted by `GET /posts`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostFilter {
    /// Case-insensitive match on title, content, category name or author username.
    pub search: Option<String>,
    /// One of `created_at`, `-created_at`, `updated_at`, `-updated_at`.
    pub ordering: Option<String>,
}

impl PostFilter {
    fn into_query(self) -> Result<PostQuery, AppError> {
        let ordering = match self.ordering.as_deref().map(str::trim) {
            None | Some("") => PostOrdering::default(),
            Some(raw) => PostOrdering::parse(raw).ok_or_else(|| {
                AppError::field(
                    "ordering",
                    format!("Unsupported ordering '{raw}'. Use created_at, -created_at, updated_at or -updated_at."),
                )
            })?,
        };

        Ok(PostQuery {
            published_only: true,
            search: self.search.filter(|s| !s.trim().is_empty()),
            ordering,
            ..PostQuery::default()
        })
    }
}

async fn ensure_category(state: &AppState, category_id: i64) -> Result<(), AppError> {
    match state.repo.get_category(category_id).await? {
        Some(_) => Ok(()),
        None => Err(AppError::field("category_id", INVALID_CATEGORY)),
    }
}

async fn load_post(state: &AppState, id: i64) -> Result<Post, AppError> {
    state.repo.get_post(id).await?.ok_or(AppError::NotFound("Post"))
}

async fn post_detail(state: &AppState, post: PostView) -> Result<PostDetail, AppError> {
    let comments = state.repo.list_comments(post.id).await?;
    Ok(PostDetail { post, comments })
}

/// list_posts
///
/// [Public Route] Published posts, newest first unless `ordering` says otherwise.
#[utoipa::path(
    get,
    path = "/posts",
    params(PostFilter),
    responses(
        (status = 200, description = "Posts", body = [PostView]),
        (status = 400, description = "Unsupported ordering")
    )
)]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(filter): Query<PostFilter>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let query = filter.into_query()?;
    Ok(Json(state.repo.list_posts(query).await?))
}

/// latest_posts
///
/// [Public Route] The five most recent published posts.
#[utoipa::path(
    get,
    path = "/posts/latest",
    responses((status = 200, description = "Posts", body = [PostView]))
)]
pub async fn latest_posts(State(state): State<AppState>) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state
        .repo
        .list_posts(PostQuery {
            published_only: true,
            limit: Some(LATEST_POSTS),
            ..PostQuery::default()
        })
        .await?;
    Ok(Json(posts))
}

/// get_post
///
/// [Public Route] A single post with its active comments.
#[utoipa::path(
    get,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, AppError> {
    let post = state
        .repo
        .get_post_view(id)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(post_detail(&state, post).await?))
}

/// get_post_by_slug
///
/// [Public Route] Same as `get_post`, addressed by slug.
#[utoipa::path(
    get,
    path = "/posts/slug/{slug}",
    params(("slug" = String, Path, description = "Post slug")),
    responses(
        (status = 200, description = "Found", body = PostDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<PostDetail>, AppError> {
    let post = state
        .repo
        .get_post_view_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    Ok(Json(post_detail(&state, post).await?))
}

/// my_posts
///
/// [Authenticated Route] Every post the caller wrote, drafts included.
#[utoipa::path(
    get,
    path = "/posts/my-posts",
    responses((status = 200, description = "Posts", body = [PostView]))
)]
pub async fn my_posts(
    principal: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let posts = state
        .repo
        .list_posts(PostQuery {
            author_id: Some(principal.id),
            ..PostQuery::default()
        })
        .await?;
    Ok(Json(posts))
}

/// create_post
///
/// [Authenticated Route] The caller becomes the author. The slug is derived from the title
/// and made unique at insert time.
#[utoipa::path(
    post,
    path = "/posts",
    request_body = CreatePostRequest,
    responses(
        (status = 201, description = "Created", body = Post),
        (status = 400, description = "Invalid fields or unknown category")
    )
)]
pub async fn create_post(
    principal: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    payload.validate()?;

    let category_id = payload
        .category_id
        .ok_or_else(|| AppError::field("category_id", INVALID_CATEGORY))?;
    ensure_category(&state, category_id).await?;

    let draft = NewPost {
        title: payload.title.trim().to_string(),
        slug: String::new(),
        author_id: principal.id,
        category_id,
        content: payload.content,
        published: payload.published.unwrap_or(true),
    };

    let repo = state.repo.as_ref();
    let post = slug::insert_with_unique_slug(repo, SlugScope::Post, &draft.title, |slug| {
        repo.insert_post(NewPost {
            slug,
            ..draft.clone()
        })
    })
    .await
    .map_err(|e| match e {
        // Category removed after the existence check.
        RepoError::MissingReference(_) => AppError::field("category_id", INVALID_CATEGORY),
        other => other.into(),
    })?;

    tracing::info!(post_id = post.id, slug = %post.slug, author = %principal.id, "post created");
    Ok((StatusCode::CREATED, Json(post)))
}

/// update_post
///
/// [Authenticated Route] Owner or privileged only. Partial; the slug never changes.
#[utoipa::path(
    put,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = UpdatePostRequest,
    responses(
        (status = 200, description = "Updated", body = Post),
        (status = 400, description = "Invalid fields or unknown category"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_post(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdatePostRequest>,
) -> Result<Json<Post>, AppError> {
    let post = load_post(&state, id).await?;
    authorize(Some(&principal), Action::Mutate, &post).require()?;
    payload.validate()?;

    if let Some(category_id) = payload.category_id {
        ensure_category(&state, category_id).await?;
    }

    let changes = UpdatePostRequest {
        title: payload.title.map(|t| t.trim().to_string()),
        ..payload
    };

    state
        .repo
        .update_post(id, changes)
        .await
        .map_err(|e| match e {
            RepoError::MissingReference(_) => AppError::field("category_id", INVALID_CATEGORY),
            other => other.into(),
        })?
        .map(Json)
        .ok_or(AppError::NotFound("Post"))
}

/// delete_post
///
/// [Authenticated Route] Owner or privileged only. Comments and likes go with it.
#[utoipa::path(
    delete,
    path = "/posts/{id}",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the author"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_post(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let post = load_post(&state, id).await?;
    authorize(Some(&principal), Action::Mutate, &post).require()?;

    if !state.repo.delete_post(id).await? {
        return Err(AppError::NotFound("Post"));
    }
    tracing::info!(post_id = id, by = %principal.id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}
