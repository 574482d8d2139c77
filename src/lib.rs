use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Identity, policy and the content rules built on top of the repository.
pub mod access;
pub mod auth;
pub mod likes;
pub mod password;
pub mod slug;

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;

// Routing segregation (Public, Authenticated, Admin).
pub mod routes;
use auth::AuthUser;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and `ToSchema` model into the OpenAPI
/// document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::accounts::register_user, handlers::accounts::login,
        handlers::accounts::refresh_token, handlers::accounts::get_me,
        handlers::categories::list_categories, handlers::categories::get_category,
        handlers::categories::get_category_posts, handlers::categories::create_category,
        handlers::categories::admin_get_category, handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::posts::list_posts, handlers::posts::latest_posts, handlers::posts::get_post,
        handlers::posts::get_post_by_slug, handlers::posts::my_posts, handlers::posts::create_post,
        handlers::posts::update_post, handlers::posts::delete_post,
        handlers::comments::list_comments, handlers::comments::add_comment,
        handlers::comments::get_comment, handlers::comments::update_comment,
        handlers::comments::delete_comment,
        handlers::likes::toggle_like
    ),
    components(
        schemas(
            models::Category, models::Post, models::Comment, models::PostView,
            models::PostDetail, models::CommentView, models::CategoryDetail,
            models::UserSummary, models::UserProfile, models::RegisterUserRequest,
            models::LoginRequest, models::LoginResponse, models::RefreshRequest,
            models::RefreshResponse, models::CreateCategoryRequest, models::UpdateCategoryRequest,
            models::CreatePostRequest, models::UpdatePostRequest, models::CreateCommentRequest,
            models::UpdateCommentRequest, models::LikeToggleResponse,
            access::Role, likes::LikeOutcome,
        )
    ),
    tags(
        (name = "blog", description = "Blog API: posts, categories, comments and likes")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single shared state handed to every handler. Cloning is cheap: the repository sits
/// behind an `Arc` and the config is a handful of strings.
#[derive(Clone)]
pub struct AppState {
    /// Persistence, Postgres in production and in-memory under test.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Runs the `AuthUser` extractor ahead of the authenticated routes so an unauthenticated
/// request is rejected with 401 before any handler work happens.
async fn auth_middleware(auth_user: AuthUser, request: Request, next: Next) -> Response {
    Span::current().record("user_id", tracing::field::display(auth_user.id));
    next.run(request).await
}

/// create_router
///
/// Assembles the route tree, applies scoped and global middleware and registers state.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    // The API is consumed cross-origin by the blog frontend; nothing is cookie-based.
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name shared by the request-id layers and `trace_span_logger`.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Base Router Assembly
    let base_router = Router::new()
        // Documentation: Swagger UI over the generated OpenAPI document.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Public Routes: reads, registration and token endpoints.
        .merge(public::public_routes())
        // Same paths as some public routes, different methods: merge joins the method
        // routers, and the layer only wraps the authenticated ones.
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        // Privilege is checked inside each admin handler, after its own `AuthUser` extraction.
        .nest("/admin", admin::admin_routes())
        .with_state(state);

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID per request unless the client sent one.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request, tagged with that ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo the ID back on the response.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer (outermost, so preflight requests never reach the routes)
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the per-request span, tagged with the `x-request-id` set by the layer above. The
/// path is recorded without its query string so search terms stay out of the logs; `user_id`
/// is declared empty and filled in by `auth_middleware` once the caller is known.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        path = %request.uri().path(),
        req_id = %request_id,
        user_id = tracing::field::Empty,
    )
}
