use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{
    auth::AuthUser,
    error::AppError,
    repository::{Constraint, RepoError, Repository},
};

/// LikeOutcome
///
/// Membership of the (principal, post) pair after a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum LikeOutcome {
    Liked,
    Unliked,
}

/// toggle_like
///
/// Flips the principal's like on a post. The delete is a single statement and the insert is
/// guarded by the unique (post, user) constraint, so concurrent toggles can never leave two
/// rows behind. Losing an insert race means the pair is already liked, which is the outcome
/// the caller asked for.
pub async fn toggle_like(
    repo: &dyn Repository,
    principal: &AuthUser,
    post_id: i64,
) -> Result<LikeOutcome, AppError> {
    if repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound("Post"));
    }

    if repo.delete_like(post_id, principal.id).await? {
        tracing::debug!(post_id, user_id = %principal.id, "post unliked");
        return Ok(LikeOutcome::Unliked);
    }

    match repo.insert_like(post_id, principal.id).await {
        Ok(()) => {
            tracing::debug!(post_id, user_id = %principal.id, "post liked");
            Ok(LikeOutcome::Liked)
        }
        Err(RepoError::UniqueViolation(Constraint::LikePair)) => {
            tracing::debug!(post_id, user_id = %principal.id, "concurrent like already recorded");
            Ok(LikeOutcome::Liked)
        }
        // The post was deleted between the lookup and the insert.
        Err(RepoError::MissingReference(_)) => Err(AppError::NotFound("Post")),
        Err(e) => Err(e.into()),
    }
}
