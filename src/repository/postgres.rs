use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{PostQuery, RepoResult, Repository};
use crate::{
    models::{
        Category, Comment, CommentView, NewCategory, NewComment, NewPost, NewUser, Post,
        PostView, UpdateCategoryRequest, UpdatePostRequest, User,
    },
    slug::SlugScope,
};

const USER_COLUMNS: &str =
    "id, username, email, first_name, last_name, password_hash, role, created_at";

const POST_COLUMNS: &str =
    "id, title, slug, author_id, category_id, content, published, created_at, updated_at";

/// Posts joined with author, category and live counters. Inactive comments are not counted.
const POST_VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.slug, p.content, p.published, p.created_at, p.updated_at,
        p.author_id, u.username AS author_username,
        p.category_id, c.name AS category_name, c.slug AS category_slug,
        (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id AND cm.active) AS comments_count,
        (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS likes_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

const COMMENT_VIEW_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.user_id, u.username, c.body, c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime (`query_as::<_, T>`),
/// so the crate builds without a live database. Constraint names come from `migrations/`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside an ILIKE pattern.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for ch in search.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let sql = format!(
            "INSERT INTO users (id, username, email, first_name, last_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(user.username)
            .bind(user.email)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.password_hash)
            .bind(user.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?)
    }

    // --- SLUGS ---

    async fn slug_exists(&self, scope: SlugScope, slug: &str) -> RepoResult<bool> {
        let sql = match scope {
            SlugScope::Post => "SELECT EXISTS (SELECT 1 FROM posts WHERE slug = $1)",
            SlugScope::Category => "SELECT EXISTS (SELECT 1 FROM categories WHERE slug = $1)",
        };
        Ok(sqlx::query_scalar::<_, bool>(sql)
            .bind(slug)
            .fetch_one(&self.pool)
            .await?)
    }

    // --- CATEGORIES ---

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?,
        )
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(
            sqlx::query_as::<_, Category>("SELECT id, name, slug FROM categories WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn create_category(&self, category: NewCategory) -> RepoResult<Category> {
        Ok(sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug) VALUES ($1, $2) RETURNING id, name, slug",
        )
        .bind(category.name)
        .bind(category.slug)
        .fetch_one(&self.pool)
        .await?)
    }

    /// Uses `COALESCE` so only the provided fields change.
    async fn update_category(
        &self,
        id: i64,
        changes: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>> {
        Ok(sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                slug = COALESCE($3, slug)
            WHERE id = $1
            RETURNING id, name, slug
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.slug)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- POSTS ---

    /// Builds the listing with `QueryBuilder` so every filter value is bound, never spliced.
    async fn list_posts(&self, query: PostQuery) -> RepoResult<Vec<PostView>> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_VIEW_SELECT);
        builder.push(" WHERE TRUE");

        if query.published_only {
            builder.push(" AND p.published = TRUE");
        }
        if let Some(author_id) = query.author_id {
            builder.push(" AND p.author_id = ");
            builder.push_bind(author_id);
        }
        if let Some(category_id) = query.category_id {
            builder.push(" AND p.category_id = ");
            builder.push_bind(category_id);
        }
        if let Some(search) = query.search.as_deref() {
            let pattern = like_pattern(search);
            builder.push(" AND (p.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.content ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR c.name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR u.username ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        builder.push(query.ordering.sql());

        if let Some(limit) = query.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        Ok(builder
            .build_query_as::<PostView>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_post_view(&self, id: i64) -> RepoResult<Option<PostView>> {
        let sql = format!("{POST_VIEW_SELECT} WHERE p.id = $1");
        Ok(sqlx::query_as::<_, PostView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn get_post_view_by_slug(&self, slug: &str) -> RepoResult<Option<PostView>> {
        let sql = format!("{POST_VIEW_SELECT} WHERE p.slug = $1");
        Ok(sqlx::query_as::<_, PostView>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Plain INSERT: a taken slug must surface as `posts_slug_key` so slug assignment can
    /// retry, hence no `ON CONFLICT` here.
    async fn insert_post(&self, post: NewPost) -> RepoResult<Post> {
        let sql = format!(
            "INSERT INTO posts (title, slug, author_id, category_id, content, published) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {POST_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(post.title)
            .bind(post.slug)
            .bind(post.author_id)
            .bind(post.category_id)
            .bind(post.content)
            .bind(post.published)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_post(&self, id: i64, changes: UpdatePostRequest) -> RepoResult<Option<Post>> {
        let sql = format!(
            r#"
            UPDATE posts
            SET title = COALESCE($2, title),
                content = COALESCE($3, content),
                category_id = COALESCE($4, category_id),
                published = COALESCE($5, published),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {POST_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.content)
            .bind(changes.category_id)
            .bind(changes.published)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_post(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- COMMENTS ---

    async fn list_comments(&self, post_id: i64) -> RepoResult<Vec<CommentView>> {
        let sql = format!(
            "{COMMENT_VIEW_SELECT} WHERE c.post_id = $1 AND c.active ORDER BY c.created_at ASC, c.id ASC"
        );
        Ok(sqlx::query_as::<_, CommentView>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, user_id, body, active, created_at, updated_at \
             FROM comments WHERE id = $1 AND active",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn get_comment_view(&self, id: i64) -> RepoResult<Option<CommentView>> {
        let sql = format!("{COMMENT_VIEW_SELECT} WHERE c.id = $1 AND c.active");
        Ok(sqlx::query_as::<_, CommentView>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Inserts and joins the author's username in one round trip.
    async fn insert_comment(&self, comment: NewComment) -> RepoResult<CommentView> {
        Ok(sqlx::query_as::<_, CommentView>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, user_id, body) VALUES ($1, $2, $3)
                RETURNING id, post_id, user_id, body, created_at, updated_at
            )
            SELECT i.id, i.post_id, i.user_id, u.username, i.body, i.created_at, i.updated_at
            FROM inserted i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.user_id)
        .bind(comment.body)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_comment(&self, id: i64, body: String) -> RepoResult<Option<CommentView>> {
        Ok(sqlx::query_as::<_, CommentView>(
            r#"
            WITH updated AS (
                UPDATE comments SET body = $2, updated_at = NOW()
                WHERE id = $1 AND active
                RETURNING id, post_id, user_id, body, created_at, updated_at
            )
            SELECT i.id, i.post_id, i.user_id, u.username, i.body, i.created_at, i.updated_at
            FROM updated i JOIN users u ON u.id = i.user_id
            "#,
        )
        .bind(id)
        .bind(body)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn deactivate_comment(&self, id: i64) -> RepoResult<bool> {
        let res = sqlx::query(
            "UPDATE comments SET active = FALSE, updated_at = NOW() WHERE id = $1 AND active",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    // --- LIKES ---

    /// No `ON CONFLICT`: the like toggle needs to see `likes_post_user_key` violations.
    async fn insert_like(&self, post_id: i64, user_id: Uuid) -> RepoResult<()> {
        sqlx::query("INSERT INTO likes (post_id, user_id) VALUES ($1, $2)")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_like(&self, post_id: i64, user_id: Uuid) -> RepoResult<bool> {
        let res = sqlx::query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
