use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    likes::{self, LikeOutcome},
    models::LikeToggleResponse,
};

/// toggle_like
///
/// [Authenticated Route] 201 when the post ends up liked, 200 when it ends up unliked.
#[utoipa::path(
    post,
    path = "/posts/{id}/like-toggle",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 201, description = "Liked", body = LikeToggleResponse),
        (status = 200, description = "Unliked", body = LikeToggleResponse),
        (status = 404, description = "Post not found")
    )
)]
pub async fn toggle_like(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
) -> Result<(StatusCode, Json<LikeToggleResponse>), AppError> {
    let outcome = likes::toggle_like(state.repo.as_ref(), &principal, post_id).await?;

    let status = match outcome {
        LikeOutcome::Liked => StatusCode::CREATED,
        LikeOutcome::Unliked => StatusCode::OK,
    };
    Ok((status, Json(LikeToggleResponse { message: outcome })))
}
