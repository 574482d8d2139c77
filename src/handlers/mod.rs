//! HTTP handlers, grouped by resource.
//!
//! Every handler resolves its principal through the `AuthUser` extractor (where one is
//! required), loads the target object fresh, checks `access::authorize`, and only then
//! touches the repository.

pub mod accounts;
pub mod categories;
pub mod comments;
pub mod likes;
pub mod posts;
