use std::future::Future;

use rand::Rng;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::repository::{Constraint, RepoError, RepoResult, Repository};

/// Commit attempts before slug assignment stops walking the numeric suffixes and falls back
/// to a random one.
pub const MAX_COMMIT_ATTEMPTS: u32 = 8;

/// SlugScope
///
/// The content kinds that own a slug namespace. Uniqueness is per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlugScope {
    Post,
    Category,
}

impl SlugScope {
    /// Longest base slug, leaving room for a `-N` suffix inside the column width
    /// (posts: 255, categories: 120).
    pub fn max_base_len(&self) -> usize {
        match self {
            SlugScope::Post => 200,
            SlugScope::Category => 100,
        }
    }

    /// Base used when a title has no ASCII letters or digits at all.
    pub fn fallback(&self) -> &'static str {
        match self {
            SlugScope::Post => "post",
            SlugScope::Category => "category",
        }
    }

    /// The unique constraint backing this scope in the store.
    pub fn constraint(&self) -> Constraint {
        match self {
            SlugScope::Post => Constraint::PostSlug,
            SlugScope::Category => Constraint::CategorySlug,
        }
    }

    /// Normalizes `source` into this scope's base slug, never returning an empty string.
    pub fn base_slug(&self, source: &str) -> String {
        let slug = slugify(source, self.max_base_len());
        if slug.is_empty() {
            self.fallback().to_string()
        } else {
            slug
        }
    }
}

/// slugify
///
/// Decomposes `text` (NFKD) and drops combining marks so accented letters keep their base
/// letter, then lowercases ASCII letters and digits, collapses every run of anything else
/// into a single `-`, strips leading and trailing separators and truncates to `max_len`.
///
/// `slugify("Hello World!", 200) == "hello-world"`, `slugify("Café Olé", 200) == "cafe-ole"`
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len().min(max_len));
    let mut pending_separator = false;

    for ch in text.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }

    // Only ASCII was pushed, so byte truncation is char-safe.
    slug.truncate(max_len);
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn candidate(base: &str, suffix: u64) -> String {
    if suffix == 0 {
        base.to_string()
    } else {
        format!("{base}-{suffix}")
    }
}

/// free_slug
///
/// Walks `base`, `base-1`, `base-2`, ... starting at `start` (0 means the bare base) and
/// returns the first candidate the store reports as unused, with its suffix.
///
/// The answer is only true at the instant it was read; the insert that follows must still
/// be prepared for a `UniqueViolation`.
pub async fn free_slug(
    repo: &dyn Repository,
    scope: SlugScope,
    base: &str,
    start: u64,
) -> RepoResult<(String, u64)> {
    let mut suffix = start;
    loop {
        let slug = candidate(base, suffix);
        if !repo.slug_exists(scope, &slug).await? {
            return Ok((slug, suffix));
        }
        suffix += 1;
    }
}

/// insert_with_unique_slug
///
/// Assigns a slug derived from `source` and hands it to `insert`. When `insert` loses a race
/// on this scope's slug constraint, the search resumes after the suffix that was taken.
/// After `MAX_COMMIT_ATTEMPTS` lost races a random 8-hex-digit suffix is tried once.
///
/// Any other error from `insert` is returned untouched.
pub async fn insert_with_unique_slug<T, F, Fut>(
    repo: &dyn Repository,
    scope: SlugScope,
    source: &str,
    mut insert: F,
) -> RepoResult<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = RepoResult<T>>,
{
    let base = scope.base_slug(source);
    let mut start = 0;

    for attempt in 1..=MAX_COMMIT_ATTEMPTS {
        let (slug, suffix) = free_slug(repo, scope, &base, start).await?;
        match insert(slug.clone()).await {
            Err(RepoError::UniqueViolation(constraint)) if constraint == scope.constraint() => {
                tracing::warn!(%slug, attempt, "slug taken between check and insert, retrying");
                start = suffix + 1;
            }
            other => return other,
        }
    }

    let slug = format!("{base}-{}", random_suffix());
    tracing::warn!(%slug, "slug contention persisted, using a random suffix");
    insert(slug).await
}

fn random_suffix() -> String {
    format!("{:08x}", rand::thread_rng().r#gen::<u32>())
}
