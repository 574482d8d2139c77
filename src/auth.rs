use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    access::Role,
    config::{AppConfig, Env},
    error::AppError,
    models::User,
    repository::RepositoryState,
};

/// TokenType
///
/// Access tokens authenticate requests; refresh tokens are only good for minting a new
/// access token. Each side rejects the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims
///
/// JWT payload issued at login and validated on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    pub token_type: TokenType,
}

/// AuthUser
///
/// The principal resolved for an authenticated request. The role is re-read from the store
/// on every request and parsed fail-closed (see `Role::from_column`).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_privileged(&self) -> bool {
        self.role.is_privileged()
    }
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            id: user.id,
            role: Role::from_column(user.role.as_deref()),
        }
    }
}

/// Signs a token of the given type for `user_id`.
pub fn issue_token(
    config: &AppConfig,
    user_id: Uuid,
    token_type: TokenType,
) -> Result<String, AppError> {
    let now = Utc::now();
    let ttl = match token_type {
        TokenType::Access => Duration::hours(config.access_token_ttl_hours),
        TokenType::Refresh => Duration::days(config.refresh_token_ttl_days),
    };

    let claims = Claims {
        sub: user_id,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        token_type,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))
}

/// Validates signature and expiry, then checks the token is of the `expected` type.
pub fn decode_token(
    config: &AppConfig,
    token: &str,
    expected: TokenType,
) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "Token has expired",
                _ => "Token is invalid",
            };
            AppError::Unauthorized(reason.to_string())
        })?
        .claims;

    if claims.token_type != expected {
        return Err(AppError::Unauthorized("Token has wrong type".to_string()));
    }
    Ok(claims)
}

/// AuthUser Extractor Implementation
///
/// Resolution order:
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming an existing user.
/// 2. `Authorization: Bearer <access token>`, validated and mapped to a stored user.
///
/// Rejection: `AppError::Unauthorized` (401, JSON error body) on any authentication failure,
/// `AppError::Repository` (500) if the store cannot be reached.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = load_user(&repo, user_id).await? {
                    return Ok(AuthUser::from(&user));
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                AppError::Unauthorized("Authentication credentials were not provided.".to_string())
            })?;

        let claims = decode_token(&config, token, TokenType::Access).inspect_err(|e| {
            tracing::debug!("rejected bearer token: {:?}", e);
        })?;

        // Tokens outlive deleted accounts; the store has the final word.
        let user = load_user(&repo, claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User not found".to_string()))?;

        Ok(AuthUser::from(&user))
    }
}

async fn load_user(repo: &RepositoryState, id: Uuid) -> Result<Option<User>, AppError> {
    repo.get_user(id).await.map_err(|e| {
        tracing::error!("user lookup failed during authentication: {:?}", e);
        AppError::Repository(e)
    })
}
