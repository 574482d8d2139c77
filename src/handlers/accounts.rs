use axum::{Json, extract::State, http::StatusCode};
use validator::Validate;

use crate::{
    AppState,
    access::Role,
    auth::{self, AuthUser, TokenType},
    error::AppError,
    extract::ApiJson,
    models::{
        LoginRequest, LoginResponse, NewUser, RefreshRequest, RefreshResponse,
        RegisterUserRequest, UserProfile, UserSummary,
    },
    password,
    repository::{Constraint, RepoError},
};

const BAD_CREDENTIALS: &str = "No active account found with the given credentials";

/// register_user
///
/// [Public Route] Creates an account. Every self-registered account gets `Role::User`;
/// there is no promotion flow.
#[utoipa::path(
    post,
    path = "/register",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = UserSummary),
        (status = 400, description = "Invalid or duplicate fields")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<UserSummary>), AppError> {
    payload.validate()?;

    let new_user = NewUser {
        username: payload.username.trim().to_string(),
        email: payload.email.trim().to_lowercase(),
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        password_hash: password::hash_password(&payload.password)?,
        role: Role::User,
    };

    let user = state
        .repo
        .create_user(new_user)
        .await
        .map_err(|e| match e {
            RepoError::UniqueViolation(Constraint::Username) => {
                AppError::field("username", "A user with that username already exists.")
            }
            RepoError::UniqueViolation(Constraint::Email) => {
                AppError::field("email", "A user with that email already exists.")
            }
            other => other.into(),
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}

/// login
///
/// [Public Route] Exchanges credentials for an access/refresh token pair. `login` is tried
/// as an email address first, then as a username.
#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    payload.validate()?;

    let login = payload.login.trim();
    let user = match state.repo.find_user_by_email(&login.to_lowercase()).await? {
        Some(user) => Some(user),
        None => state.repo.find_user_by_username(login).await?,
    };

    let Some(user) = user else {
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    };
    if !password::verify_password(&payload.password, &user.password_hash)? {
        tracing::info!(user_id = %user.id, "login rejected: wrong password");
        return Err(AppError::Unauthorized(BAD_CREDENTIALS.to_string()));
    }

    let access = auth::issue_token(&state.config, user.id, TokenType::Access)?;
    let refresh = auth::issue_token(&state.config, user.id, TokenType::Refresh)?;

    Ok(Json(LoginResponse {
        access,
        refresh,
        user: UserSummary::from(&user),
    }))
}

/// refresh_token
///
/// [Public Route] Mints a new access token from a valid refresh token. Refresh tokens are
/// not rotated.
#[utoipa::path(
    post,
    path = "/token/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Invalid, expired or wrong-type token")
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RefreshRequest>,
) -> Result<Json<RefreshResponse>, AppError> {
    payload.validate()?;

    let claims = auth::decode_token(&state.config, &payload.refresh, TokenType::Refresh)?;
    if state.repo.get_user(claims.sub).await?.is_none() {
        return Err(AppError::Unauthorized("User no longer exists".to_string()));
    }

    let access = auth::issue_token(&state.config, claims.sub, TokenType::Access)?;
    Ok(Json(RefreshResponse { access }))
}

/// get_me
///
/// [Authenticated Route] The caller's profile with its resolved privilege level.
#[utoipa::path(
    get,
    path = "/me",
    responses((status = 200, description = "Profile", body = UserProfile))
)]
pub async fn get_me(
    principal: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .repo
        .get_user(principal.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(UserProfile {
        user: UserSummary::from(&user),
        role: principal.role,
        is_privileged: principal.is_privileged(),
    }))
}
