use std::{
    collections::BTreeMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Constraint, PostOrdering, PostQuery, RepoError, RepoResult, Repository};
use crate::{
    models::{
        Category, Comment, CommentView, Like, NewCategory, NewComment, NewPost, NewUser, Post,
        PostView, UpdateCategoryRequest, UpdatePostRequest, User,
    },
    slug::SlugScope,
};

#[derive(Default)]
struct Store {
    users: BTreeMap<Uuid, User>,
    categories: BTreeMap<i64, Category>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    likes: Vec<Like>,
    last_category_id: i64,
    last_post_id: i64,
    last_comment_id: i64,
}

impl Store {
    fn post_view(&self, post: &Post) -> PostView {
        let author_username = self
            .users
            .get(&post.author_id)
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let category = post.category_id.and_then(|id| self.categories.get(&id));

        PostView {
            id: post.id,
            title: post.title.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            published: post.published,
            created_at: post.created_at,
            updated_at: post.updated_at,
            author_id: post.author_id,
            author_username,
            category_id: category.map(|c| c.id),
            category_name: category.map(|c| c.name.clone()),
            category_slug: category.map(|c| c.slug.clone()),
            comments_count: self
                .comments
                .values()
                .filter(|c| c.post_id == post.id && c.active)
                .count() as i64,
            likes_count: self.likes.iter().filter(|l| l.post_id == post.id).count() as i64,
        }
    }

    fn comment_view(&self, comment: &Comment) -> CommentView {
        CommentView {
            id: comment.id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            username: self
                .users
                .get(&comment.user_id)
                .map(|u| u.username.clone())
                .unwrap_or_default(),
            body: comment.body.clone(),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }

    fn active_comment(&self, id: i64) -> Option<&Comment> {
        self.comments.get(&id).filter(|c| c.active)
    }

    fn check_category_unique(&self, id: i64, name: &str, slug: &str) -> RepoResult<()> {
        let others = self.categories.values().filter(|c| c.id != id);
        for other in others {
            if other.name == name {
                return Err(RepoError::UniqueViolation(Constraint::CategoryName));
            }
            if other.slug == slug {
                return Err(RepoError::UniqueViolation(Constraint::CategorySlug));
            }
        }
        Ok(())
    }
}

/// MemoryRepository
///
/// In-process `Repository` holding everything behind one mutex. It enforces the same unique
/// and foreign-key rules as the Postgres schema, so slug assignment and the like toggle see
/// identical conflict signals. Each trait call takes the lock once; nothing is held across
/// calls, which keeps the check-then-insert race of the real store observable.
#[derive(Default)]
pub struct MemoryRepository {
    store: Mutex<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut store = self.store();
        if store.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::UniqueViolation(Constraint::Username));
        }
        if store.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation(Constraint::Email));
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            password_hash: user.password_hash,
            role: Some(user.role.as_str().to_string()),
            created_at: Utc::now(),
        };
        store.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.store().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        Ok(self.store().users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        Ok(self
            .store()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn slug_exists(&self, scope: SlugScope, slug: &str) -> RepoResult<bool> {
        let store = self.store();
        Ok(match scope {
            SlugScope::Post => store.posts.values().any(|p| p.slug == slug),
            SlugScope::Category => store.categories.values().any(|c| c.slug == slug),
        })
    }

    async fn list_categories(&self) -> RepoResult<Vec<Category>> {
        let mut categories: Vec<Category> = self.store().categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn get_category(&self, id: i64) -> RepoResult<Option<Category>> {
        Ok(self.store().categories.get(&id).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> RepoResult<Category> {
        let mut store = self.store();
        store.check_category_unique(0, &category.name, &category.slug)?;

        store.last_category_id += 1;
        let created = Category {
            id: store.last_category_id,
            name: category.name,
            slug: category.slug,
        };
        store.categories.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_category(
        &self,
        id: i64,
        changes: UpdateCategoryRequest,
    ) -> RepoResult<Option<Category>> {
        let mut store = self.store();
        let Some(current) = store.categories.get(&id).cloned() else {
            return Ok(None);
        };

        let updated = Category {
            id,
            name: changes.name.unwrap_or(current.name),
            slug: changes.slug.unwrap_or(current.slug),
        };
        store.check_category_unique(id, &updated.name, &updated.slug)?;
        store.categories.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn delete_category(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store();
        if store.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for post in store.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(true)
    }

    async fn list_posts(&self, query: PostQuery) -> RepoResult<Vec<PostView>> {
        let store = self.store();
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut views: Vec<PostView> = store
            .posts
            .values()
            .filter(|p| !query.published_only || p.published)
            .filter(|p| query.author_id.is_none_or(|author| p.author_id == author))
            .filter(|p| query.category_id.is_none_or(|cat| p.category_id == Some(cat)))
            .map(|p| store.post_view(p))
            .filter(|v| match &needle {
                None => true,
                Some(needle) => [
                    Some(&v.title),
                    Some(&v.content),
                    v.category_name.as_ref(),
                    Some(&v.author_username),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle.as_str())),
            })
            .collect();

        match query.ordering {
            PostOrdering::NewestFirst => {
                views.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)))
            }
            PostOrdering::OldestFirst => {
                views.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
            }
            PostOrdering::RecentlyUpdated => {
                views.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)))
            }
            PostOrdering::LeastRecentlyUpdated => {
                views.sort_by(|a, b| (a.updated_at, a.id).cmp(&(b.updated_at, b.id)))
            }
        }

        if let Some(limit) = query.limit {
            views.truncate(limit.max(0) as usize);
        }
        Ok(views)
    }

    async fn get_post(&self, id: i64) -> RepoResult<Option<Post>> {
        Ok(self.store().posts.get(&id).cloned())
    }

    async fn get_post_view(&self, id: i64) -> RepoResult<Option<PostView>> {
        let store = self.store();
        Ok(store.posts.get(&id).map(|p| store.post_view(p)))
    }

    async fn get_post_view_by_slug(&self, slug: &str) -> RepoResult<Option<PostView>> {
        let store = self.store();
        Ok(store
            .posts
            .values()
            .find(|p| p.slug == slug)
            .map(|p| store.post_view(p)))
    }

    async fn insert_post(&self, post: NewPost) -> RepoResult<Post> {
        let mut store = self.store();
        if store.posts.values().any(|p| p.slug == post.slug) {
            return Err(RepoError::UniqueViolation(Constraint::PostSlug));
        }
        if !store.users.contains_key(&post.author_id) {
            return Err(RepoError::MissingReference("posts_author_id_fkey".to_string()));
        }
        if !store.categories.contains_key(&post.category_id) {
            return Err(RepoError::MissingReference("posts_category_id_fkey".to_string()));
        }

        store.last_post_id += 1;
        let now = Utc::now();
        let created = Post {
            id: store.last_post_id,
            title: post.title,
            slug: post.slug,
            author_id: post.author_id,
            category_id: Some(post.category_id),
            content: post.content,
            published: post.published,
            created_at: now,
            updated_at: now,
        };
        store.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: i64, changes: UpdatePostRequest) -> RepoResult<Option<Post>> {
        let mut store = self.store();
        if let Some(category_id) = changes.category_id {
            if !store.categories.contains_key(&category_id) {
                return Err(RepoError::MissingReference("posts_category_id_fkey".to_string()));
            }
        }

        let Some(post) = store.posts.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = changes.title {
            post.title = title;
        }
        if let Some(content) = changes.content {
            post.content = content;
        }
        if let Some(category_id) = changes.category_id {
            post.category_id = Some(category_id);
        }
        if let Some(published) = changes.published {
            post.published = published;
        }
        post.updated_at = Utc::now();
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store();
        if store.posts.remove(&id).is_none() {
            return Ok(false);
        }
        store.comments.retain(|_, c| c.post_id != id);
        store.likes.retain(|l| l.post_id != id);
        Ok(true)
    }

    async fn list_comments(&self, post_id: i64) -> RepoResult<Vec<CommentView>> {
        let store = self.store();
        let mut views: Vec<CommentView> = store
            .comments
            .values()
            .filter(|c| c.post_id == post_id && c.active)
            .map(|c| store.comment_view(c))
            .collect();
        views.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(views)
    }

    async fn get_comment(&self, id: i64) -> RepoResult<Option<Comment>> {
        Ok(self.store().active_comment(id).cloned())
    }

    async fn get_comment_view(&self, id: i64) -> RepoResult<Option<CommentView>> {
        let store = self.store();
        Ok(store.active_comment(id).map(|c| store.comment_view(c)))
    }

    async fn insert_comment(&self, comment: NewComment) -> RepoResult<CommentView> {
        let mut store = self.store();
        if !store.posts.contains_key(&comment.post_id) {
            return Err(RepoError::MissingReference("comments_post_id_fkey".to_string()));
        }
        if !store.users.contains_key(&comment.user_id) {
            return Err(RepoError::MissingReference("comments_user_id_fkey".to_string()));
        }

        store.last_comment_id += 1;
        let now = Utc::now();
        let created = Comment {
            id: store.last_comment_id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            body: comment.body,
            active: true,
            created_at: now,
            updated_at: now,
        };
        store.comments.insert(created.id, created.clone());
        Ok(store.comment_view(&created))
    }

    async fn update_comment(&self, id: i64, body: String) -> RepoResult<Option<CommentView>> {
        let mut store = self.store();
        let Some(comment) = store.comments.get_mut(&id).filter(|c| c.active) else {
            return Ok(None);
        };
        comment.body = body;
        comment.updated_at = Utc::now();
        let updated = comment.clone();
        Ok(Some(store.comment_view(&updated)))
    }

    async fn deactivate_comment(&self, id: i64) -> RepoResult<bool> {
        let mut store = self.store();
        match store.comments.get_mut(&id).filter(|c| c.active) {
            Some(comment) => {
                comment.active = false;
                comment.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_like(&self, post_id: i64, user_id: Uuid) -> RepoResult<()> {
        let mut store = self.store();
        if !store.posts.contains_key(&post_id) {
            return Err(RepoError::MissingReference("likes_post_id_fkey".to_string()));
        }
        if store
            .likes
            .iter()
            .any(|l| l.post_id == post_id && l.user_id == user_id)
        {
            return Err(RepoError::UniqueViolation(Constraint::LikePair));
        }
        store.likes.push(Like {
            post_id,
            user_id,
            created_at: Utc::now(),
        });
        Ok(())
    }

    async fn delete_like(&self, post_id: i64, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store();
        let before = store.likes.len();
        store
            .likes
            .retain(|l| !(l.post_id == post_id && l.user_id == user_id));
        Ok(store.likes.len() < before)
    }
}
