use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind `auth_middleware`, so handlers always receive a resolved
/// `AuthUser`. Mutations on posts and comments are additionally gated by
/// `access::authorize` against the freshly loaded object.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::accounts::get_me))
        // POST /categories
        // Privileged callers only; the check lives in the handler.
        .route("/categories", post(handlers::categories::create_category))
        // --- Posts ---
        .route("/posts", post(handlers::posts::create_post))
        // GET /posts/my-posts
        // Includes unpublished drafts.
        .route("/posts/my-posts", get(handlers::posts::my_posts))
        .route(
            "/posts/{id}",
            put(handlers::posts::update_post)
                .patch(handlers::posts::update_post)
                .delete(handlers::posts::delete_post),
        )
        // POST /posts/{id}/like-toggle
        .route("/posts/{id}/like-toggle", post(handlers::likes::toggle_like))
        // --- Comments ---
        .route(
            "/posts/{id}/comments",
            get(handlers::comments::list_comments).post(handlers::comments::add_comment),
        )
        .route(
            "/comments/{id}",
            get(handlers::comments::get_comment)
                .put(handlers::comments::update_comment)
                .patch(handlers::comments::update_comment)
                .delete(handlers::comments::delete_comment),
        )
}
