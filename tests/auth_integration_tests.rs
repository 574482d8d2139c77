use axum::{
    extract::FromRequestParts,
    http::{Request, StatusCode, header, request::Parts},
    response::IntoResponse,
};
use blog_api::{
    AppError, AppState,
    access::Role,
    auth::{self, AuthUser, Claims, TokenType},
    config::{AppConfig, Env},
    models::NewUser,
    repository::{MemoryRepository, Repository},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Utilities ---

fn test_state(env: Env) -> (AppState, Arc<MemoryRepository>) {
    let repo = Arc::new(MemoryRepository::new());
    let config = AppConfig {
        env,
        ..AppConfig::default()
    };
    let state = AppState {
        repo: repo.clone(),
        config,
    };
    (state, repo)
}

async fn seed_user(repo: &MemoryRepository, username: &str, role: Role) -> Uuid {
    repo.create_user(NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        first_name: String::new(),
        last_name: String::new(),
        password_hash: "not-a-real-hash".to_string(),
        role,
    })
    .await
    .unwrap()
    .id
}

fn parts_with(headers: &[(&str, String)]) -> Parts {
    let mut builder = Request::builder().uri("/me");
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    builder.body(()).unwrap().into_parts().0
}

fn bearer(token: &str) -> (&'static str, String) {
    (header::AUTHORIZATION.as_str(), format!("Bearer {token}"))
}

/// Runs the extractor and reduces a rejection to the status it would render with.
async fn extract(parts: &mut Parts, state: &AppState) -> Result<AuthUser, StatusCode> {
    AuthUser::from_request_parts(parts, state)
        .await
        .map_err(|e| e.into_response().status())
}

// --- Token Handling ---

#[tokio::test]
async fn test_access_token_resolves_principal_with_role() {
    let (state, repo) = test_state(Env::Production);
    let admin_id = seed_user(&repo, "boss", Role::Admin).await;

    let token = auth::issue_token(&state.config, admin_id, TokenType::Access).unwrap();
    let mut parts = parts_with(&[bearer(&token)]);

    let principal = extract(&mut parts, &state).await.unwrap();
    assert_eq!(principal.id, admin_id);
    assert_eq!(principal.role, Role::Admin);
    assert!(principal.is_privileged());
}

#[tokio::test]
async fn test_missing_header_is_rejected() {
    let (state, _repo) = test_state(Env::Production);
    let mut parts = parts_with(&[]);

    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejection_is_an_unauthorized_app_error() {
    let (state, _repo) = test_state(Env::Production);
    let mut parts = parts_with(&[("authorization", "Basic dXNlcjpwYXNz".to_string())]);

    let err = AuthUser::from_request_parts(&mut parts, &state).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_refresh_token_cannot_authenticate_requests() {
    let (state, repo) = test_state(Env::Production);
    let user_id = seed_user(&repo, "reader", Role::User).await;

    let refresh = auth::issue_token(&state.config, user_id, TokenType::Refresh).unwrap();
    let mut parts = parts_with(&[bearer(&refresh)]);

    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let (state, repo) = test_state(Env::Production);
    let user_id = seed_user(&repo, "reader", Role::User).await;

    let foreign = AppConfig {
        jwt_secret: "some-other-secret".to_string(),
        ..AppConfig::default()
    };
    let token = auth::issue_token(&foreign, user_id, TokenType::Access).unwrap();
    let mut parts = parts_with(&[bearer(&token)]);

    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let (state, repo) = test_state(Env::Production);
    let user_id = seed_user(&repo, "reader", Role::User).await;

    let issued = Utc::now() - Duration::hours(3);
    let claims = Claims {
        sub: user_id,
        iat: issued.timestamp() as usize,
        exp: (issued + Duration::hours(1)).timestamp() as usize,
        token_type: TokenType::Access,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.config.jwt_secret.as_bytes()),
    )
    .unwrap();

    match auth::decode_token(&state.config, &token, TokenType::Access) {
        Err(AppError::Unauthorized(reason)) => assert_eq!(reason, "Token has expired"),
        other => panic!("expected an expiry rejection, got {other:?}"),
    }

    let mut parts = parts_with(&[bearer(&token)]);
    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let (state, _repo) = test_state(Env::Production);

    let token = auth::issue_token(&state.config, Uuid::new_v4(), TokenType::Access).unwrap();
    let mut parts = parts_with(&[bearer(&token)]);

    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_issued_tokens_carry_configured_lifetimes() {
    let config = AppConfig::default();
    let user_id = Uuid::new_v4();

    let access = auth::issue_token(&config, user_id, TokenType::Access).unwrap();
    let refresh = auth::issue_token(&config, user_id, TokenType::Refresh).unwrap();

    let access = auth::decode_token(&config, &access, TokenType::Access).unwrap();
    let refresh = auth::decode_token(&config, &refresh, TokenType::Refresh).unwrap();

    assert_eq!(access.exp - access.iat, 24 * 3600);
    assert_eq!(refresh.exp - refresh.iat, 7 * 24 * 3600);
    assert_eq!(access.sub, user_id);
}

// --- Local Bypass ---

#[tokio::test]
async fn test_local_bypass_header_resolves_existing_user() {
    let (state, repo) = test_state(Env::Local);
    let user_id = seed_user(&repo, "dev", Role::User).await;

    let mut parts = parts_with(&[("x-user-id", user_id.to_string())]);
    let principal = extract(&mut parts, &state).await.unwrap();

    assert_eq!(principal.id, user_id);
    assert_eq!(principal.role, Role::User);
}

#[tokio::test]
async fn test_local_bypass_is_ignored_in_production() {
    let (state, repo) = test_state(Env::Production);
    let user_id = seed_user(&repo, "dev", Role::Admin).await;

    let mut parts = parts_with(&[("x-user-id", user_id.to_string())]);
    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_local_bypass_for_unknown_user_falls_through_to_token_check() {
    let (state, _repo) = test_state(Env::Local);

    let mut parts = parts_with(&[("x-user-id", Uuid::new_v4().to_string())]);
    assert_eq!(extract(&mut parts, &state).await.unwrap_err(), StatusCode::UNAUTHORIZED);
}

