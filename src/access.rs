use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::AppError,
    models::{Comment, Post},
};

/// Role
///
/// The closed set of account roles stored in `users.role`. Only `Admin` is privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Resolves the raw `role` column. Missing or unrecognised values are never an error:
    /// they resolve to `Role::User`, so a broken row can only lose privileges.
    pub fn from_column(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("admin") => Role::Admin,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_privileged(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Action
///
/// What a request wants to do with a content item. Safe HTTP methods map to `Read`,
/// everything else to `Mutate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Mutate,
}

/// Decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    /// Turns a `Deny` into `AppError::AuthorizationDenied` so handlers can use `?`.
    pub fn require(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AppError::AuthorizationDenied),
        }
    }
}

/// Owned
///
/// Content with exactly one owning principal, fixed at creation.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for Post {
    fn owner_id(&self) -> Uuid {
        self.author_id
    }
}

impl Owned for Comment {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// authorize
///
/// Ownership authorization for a single request. Pure: the result depends only on the
/// arguments, which callers load fresh for every request.
///
/// - no principal: `Deny`
/// - `Read`: `Allow`
/// - `Mutate`: `Allow` iff the principal is privileged or owns the item
pub fn authorize<T: Owned + ?Sized>(
    principal: Option<&AuthUser>,
    action: Action,
    item: &T,
) -> Decision {
    let Some(principal) = principal else {
        return Decision::Deny;
    };

    match action {
        Action::Read => Decision::Allow,
        Action::Mutate if principal.is_privileged() || principal.id == item.owner_id() => {
            Decision::Allow
        }
        Action::Mutate => Decision::Deny,
    }
}

/// require_privileged
///
/// Gate for administrative endpoints (category management).
pub fn require_privileged(principal: &AuthUser) -> Result<(), AppError> {
    if principal.is_privileged() {
        Ok(())
    } else {
        tracing::debug!(user_id = %principal.id, "privileged endpoint refused");
        Err(AppError::AuthorizationDenied)
    }
}
