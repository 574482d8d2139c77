use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    access::require_privileged,
    auth::AuthUser,
    error::AppError,
    extract::ApiJson,
    models::{Category, CategoryDetail, CreateCategoryRequest, NewCategory, PostView, UpdateCategoryRequest},
    repository::{Constraint, PostQuery, RepoError},
    slug::{self, SlugScope},
};

/// Column width of `categories.slug`.
const CATEGORY_SLUG_MAX: usize = 120;

fn category_conflict(err: RepoError) -> AppError {
    match err {
        RepoError::UniqueViolation(Constraint::CategoryName) => {
            AppError::field("name", "category with this name already exists.")
        }
        RepoError::UniqueViolation(Constraint::CategorySlug) => {
            AppError::field("slug", "category with this slug already exists.")
        }
        other => other.into(),
    }
}

/// Normalizes a client-supplied slug; it must still contain something after normalization.
fn explicit_slug(raw: &str) -> Result<String, AppError> {
    let slug = slug::slugify(raw, CATEGORY_SLUG_MAX);
    if slug.is_empty() {
        return Err(AppError::field(
            "slug",
            "Enter a valid slug consisting of letters, numbers or hyphens.",
        ));
    }
    Ok(slug)
}

/// list_categories
///
/// [Public Route] All categories, alphabetically.
#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "Categories", body = [Category]))
)]
pub async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>, AppError> {
    Ok(Json(state.repo.list_categories().await?))
}

/// get_category
///
/// [Public Route] A category and its published posts.
#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = CategoryDetail),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CategoryDetail>, AppError> {
    let category = state
        .repo
        .get_category(id)
        .await?
        .ok_or(AppError::NotFound("Category"))?;

    let posts = state
        .repo
        .list_posts(PostQuery {
            published_only: true,
            category_id: Some(id),
            ..PostQuery::default()
        })
        .await?;

    Ok(Json(CategoryDetail { category, posts }))
}

/// get_category_posts
///
/// [Public Route] Published posts in a category, newest first.
#[utoipa::path(
    get,
    path = "/categories/{id}/posts",
    params(("id" = i64, Path, description = "Category ID")),
    responses((status = 200, description = "Posts", body = [PostView]))
)]
pub async fn get_category_posts(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<PostView>>, AppError> {
    if state.repo.get_category(id).await?.is_none() {
        return Err(AppError::NotFound("Category"));
    }

    let posts = state
        .repo
        .list_posts(PostQuery {
            published_only: true,
            category_id: Some(id),
            ..PostQuery::default()
        })
        .await?;
    Ok(Json(posts))
}

/// create_category
///
/// [Authenticated Route] Privileged only. Without an explicit `slug`, one is assigned from
/// the name through the same collision-resolving path as post slugs.
#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Invalid or duplicate fields"),
        (status = 403, description = "Not privileged")
    )
)]
pub async fn create_category(
    principal: AuthUser,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), AppError> {
    require_privileged(&principal)?;
    payload.validate()?;

    let name = payload.name.trim().to_string();
    let repo = state.repo.as_ref();

    let created = match payload.slug.as_deref() {
        Some(raw) => {
            let slug = explicit_slug(raw)?;
            repo.create_category(NewCategory { name, slug }).await
        }
        None => {
            slug::insert_with_unique_slug(repo, SlugScope::Category, &name, |slug| {
                repo.create_category(NewCategory {
                    name: name.clone(),
                    slug,
                })
            })
            .await
        }
    }
    .map_err(category_conflict)?;

    tracing::info!(category_id = created.id, slug = %created.slug, "category created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// admin_get_category
///
/// [Admin Route] Plain category record for the admin editor.
#[utoipa::path(
    get,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Found", body = Category),
        (status = 403, description = "Not privileged"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn admin_get_category(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Category>, AppError> {
    require_privileged(&principal)?;
    state
        .repo
        .get_category(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Category"))
}

/// update_category
///
/// [Admin Route] Partial update. A provided slug is normalized but not de-duplicated: a
/// collision is reported back to the admin.
#[utoipa::path(
    put,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Updated", body = Category),
        (status = 400, description = "Invalid or duplicate fields"),
        (status = 403, description = "Not privileged"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_category(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, AppError> {
    require_privileged(&principal)?;
    payload.validate()?;

    let changes = UpdateCategoryRequest {
        name: payload.name.map(|n| n.trim().to_string()),
        slug: payload.slug.as_deref().map(explicit_slug).transpose()?,
    };

    state
        .repo
        .update_category(id, changes)
        .await
        .map_err(category_conflict)?
        .map(Json)
        .ok_or(AppError::NotFound("Category"))
}

/// delete_category
///
/// [Admin Route] Removes the category; its posts stay, uncategorized.
#[utoipa::path(
    delete,
    path = "/admin/categories/{id}",
    params(("id" = i64, Path, description = "Category ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not privileged"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_category(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    require_privileged(&principal)?;

    if state.repo.delete_category(id).await? {
        tracing::info!(category_id = id, by = %principal.id, "category deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("Category"))
    }
}
