use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Category administration. Each handler extracts `AuthUser` itself and then requires a
/// privileged role, so an anonymous request gets 401 and a regular user 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET/PUT/PATCH/DELETE /admin/categories/{id}
        .route(
            "/categories/{id}",
            get(handlers::categories::admin_get_category)
                .put(handlers::categories::update_category)
                .patch(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
}
