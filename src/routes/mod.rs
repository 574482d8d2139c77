/// Router Module Index
///
/// Routes are split by how they are protected, so access control is applied per module
/// (via Axum layers) rather than remembered per handler.

/// Routes open to anonymous clients: account entry points and published content.
pub mod public;

/// Routes behind the `AuthUser` middleware. Ownership checks happen in the handlers.
pub mod authenticated;

/// Category management, nested under `/admin`. Handlers require a privileged principal.
pub mod admin;
