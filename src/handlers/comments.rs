use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use validator::Validate;

use crate::{
    AppState,
    access::{Action, authorize},
    auth::AuthUser,
    error::AppError,
    extract::ApiJson,
    models::{Comment, CommentView, CreateCommentRequest, NewComment, UpdateCommentRequest},
    repository::RepoError,
};

async fn load_comment(state: &AppState, id: i64) -> Result<Comment, AppError> {
    state
        .repo
        .get_comment(id)
        .await?
        .ok_or(AppError::NotFound("Comment"))
}

/// list_comments
///
/// [Authenticated Route] Active comments on a post, oldest first.
#[utoipa::path(
    get,
    path = "/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Comments", body = [CommentView]),
        (status = 404, description = "Post not found")
    )
)]
pub async fn list_comments(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<Json<Vec<CommentView>>, AppError> {
    let post = state
        .repo
        .get_post(post_id)
        .await?
        .ok_or(AppError::NotFound("Post"))?;
    authorize(Some(&principal), Action::Read, &post).require()?;

    Ok(Json(state.repo.list_comments(post_id).await?))
}

/// add_comment
///
/// [Authenticated Route] The caller becomes the comment's owner.
#[utoipa::path(
    post,
    path = "/posts/{id}/comments",
    params(("id" = i64, Path, description = "Post ID")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Created", body = CommentView),
        (status = 400, description = "Empty body"),
        (status = 404, description = "Post not found")
    )
)]
pub async fn add_comment(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    ApiJson(payload): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, Json<CommentView>), AppError> {
    if state.repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post"));
    }
    payload.validate()?;

    let comment = state
        .repo
        .insert_comment(NewComment {
            post_id,
            user_id: principal.id,
            body: payload.body.trim().to_string(),
        })
        .await
        .map_err(|e| match e {
            RepoError::MissingReference(_) => AppError::NotFound("Post"),
            other => other.into(),
        })?;

    tracing::debug!(comment_id = comment.id, post_id, user_id = %principal.id, "comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_comment
#[utoipa::path(
    get,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = CommentView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_comment(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<CommentView>, AppError> {
    let comment = load_comment(&state, id).await?;
    authorize(Some(&principal), Action::Read, &comment).require()?;

    state
        .repo
        .get_comment_view(id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Comment"))
}

/// update_comment
///
/// [Authenticated Route] Owner or privileged only.
#[utoipa::path(
    put,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    request_body = UpdateCommentRequest,
    responses(
        (status = 200, description = "Updated", body = CommentView),
        (status = 400, description = "Empty body"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_comment(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    ApiJson(payload): ApiJson<UpdateCommentRequest>,
) -> Result<Json<CommentView>, AppError> {
    let comment = load_comment(&state, id).await?;
    authorize(Some(&principal), Action::Mutate, &comment).require()?;
    payload.validate()?;

    state
        .repo
        .update_comment(id, payload.body.trim().to_string())
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Comment"))
}

/// delete_comment
///
/// [Authenticated Route] Owner or privileged only. Soft delete: the row stays, hidden.
#[utoipa::path(
    delete,
    path = "/comments/{id}",
    params(("id" = i64, Path, description = "Comment ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_comment(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    let comment = load_comment(&state, id).await?;
    authorize(Some(&principal), Action::Mutate, &comment).require()?;

    if !state.repo.deactivate_comment(id).await? {
        return Err(AppError::NotFound("Comment"));
    }
    tracing::info!(comment_id = id, by = %principal.id, "comment deactivated");
    Ok(StatusCode::NO_CONTENT)
}
