use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Unauthenticated endpoints. Listings only ever show published posts; retrieval by id or
/// slug returns the post as stored.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // --- Accounts ---
        .route("/register", post(handlers::accounts::register_user))
        .route("/login", post(handlers::accounts::login))
        .route("/token/refresh", post(handlers::accounts::refresh_token))
        // --- Categories ---
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/{id}", get(handlers::categories::get_category))
        .route(
            "/categories/{id}/posts",
            get(handlers::categories::get_category_posts),
        )
        // --- Posts ---
        // GET /posts?search=...&ordering=...
        .route("/posts", get(handlers::posts::list_posts))
        .route("/posts/latest", get(handlers::posts::latest_posts))
        .route("/posts/slug/{slug}", get(handlers::posts::get_post_by_slug))
        .route("/posts/{id}", get(handlers::posts::get_post))
}
