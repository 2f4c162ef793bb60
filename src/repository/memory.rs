//! In-memory repository. Same semantics as the Postgres one, including
//! set-null and cascade on delete. Data is lost on process restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    feed::{self, PostQuery},
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        comment::Comment,
        location::{Location, LocationRequest},
        post::{Post, PostInput},
        user::{NewUser, ProfileChanges, User},
    },
    policy::{self, Action, Actor, Resource},
    repository::{BlogRepository, Mutation},
};

#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    title: String,
    text: String,
    image: Option<String>,
    pub_date: DateTime<Utc>,
    is_published: bool,
    created_at: DateTime<Utc>,
    author_id: i64,
    category_id: Option<i64>,
    location_id: Option<i64>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i64,
    post_id: i64,
    author_id: i64,
    text: String,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Tables {
    last_id: i64,
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    locations: BTreeMap<i64, Location>,
    posts: BTreeMap<i64, PostRow>,
    comments: BTreeMap<i64, CommentRow>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn username(&self, user_id: i64) -> String {
        self.users
            .get(&user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default()
    }

    fn hydrate_post(&self, row: &PostRow) -> Post {
        let category = row.category_id.and_then(|id| self.categories.get(&id));
        let location = row.location_id.and_then(|id| self.locations.get(&id));
        let comment_count = self
            .comments
            .values()
            .filter(|c| c.post_id == row.id)
            .count() as i64;

        Post {
            id: row.id,
            title: row.title.clone(),
            text: row.text.clone(),
            image: row.image.clone(),
            pub_date: row.pub_date,
            is_published: row.is_published,
            created_at: row.created_at,
            author_id: row.author_id,
            author_username: self.username(row.author_id),
            category_id: category.map(|c| c.id),
            category_slug: category.map(|c| c.slug.clone()),
            category_title: category.map(|c| c.title.clone()),
            category_is_published: category.map(|c| c.is_published),
            location_id: location.map(|l| l.id),
            location_name: location.map(|l| l.name.clone()),
            comment_count,
        }
    }

    fn hydrate_comment(&self, row: &CommentRow) -> Comment {
        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_username: self.username(row.author_id),
            text: row.text.clone(),
            created_at: row.created_at,
        }
    }

    fn post(&self, id: i64) -> Option<Post> {
        self.posts.get(&id).map(|row| self.hydrate_post(row))
    }

    fn comment_on(&self, post_id: i64, comment_id: i64) -> Option<Comment> {
        self.comments
            .get(&comment_id)
            .filter(|c| c.post_id == post_id)
            .map(|row| self.hydrate_comment(row))
    }
}

/// In-memory repository using a `BTreeMap` per table behind one async `RwLock`.
///
/// Every guarded write holds the write lock from the policy check to the
/// write, which gives the same atomicity as a database transaction.
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlogRepository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.values().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let id = tables.next_id();
        let user = User {
            id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password: user.password_hash,
            is_superuser: user.is_superuser,
            created_at: Utc::now(),
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(&id).map(|user| {
            user.first_name = changes.first_name;
            user.last_name = changes.last_name;
            user.email = changes.email;
            user.clone()
        }))
    }

    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, AppError> {
        let mut tables = self.tables.write().await;

        if tables.categories.values().any(|c| c.slug == req.slug) {
            return Err(AppError::Conflict(format!(
                "Category slug '{}' already exists",
                req.slug
            )));
        }

        let id = tables.next_id();
        let category = Category {
            id,
            title: req.title,
            description: req.description,
            slug: req.slug,
            is_published: req.is_published.unwrap_or(true),
            created_at: Utc::now(),
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn find_category_by_id(&self, id: i64) -> Result<Option<Category>, AppError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> Result<Option<Category>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.categories.get_mut(&id).map(|category| {
            category.title = req.title;
            category.description = req.description;
            category.is_published = req.is_published;
            category.clone()
        }))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.categories.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
        Ok(true)
    }

    async fn create_location(&self, req: LocationRequest) -> Result<Location, AppError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let location = Location {
            id,
            name: req.name,
            is_published: req.is_published.unwrap_or(true),
            created_at: Utc::now(),
        };
        tables.locations.insert(id, location.clone());
        Ok(location)
    }

    async fn find_location(&self, id: i64) -> Result<Option<Location>, AppError> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn update_location(&self, id: i64, req: LocationRequest) -> Result<Option<Location>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.locations.get_mut(&id).map(|location| {
            location.name = req.name;
            if let Some(is_published) = req.is_published {
                location.is_published = is_published;
            }
            location.clone()
        }))
    }

    async fn delete_location(&self, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if tables.locations.remove(&id).is_none() {
            return Ok(false);
        }
        for post in tables.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
        Ok(true)
    }

    async fn create_post(&self, author_id: i64, input: PostInput, now: DateTime<Utc>) -> Result<Post, AppError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let row = PostRow {
            id,
            title: input.title,
            text: input.text,
            image: input.image,
            pub_date: input.pub_date.unwrap_or(now),
            is_published: input.is_published.unwrap_or(true),
            created_at: now,
            author_id,
            category_id: input.category_id,
            location_id: input.location_id,
        };
        let post = tables.hydrate_post(&row);
        tables.posts.insert(id, row);
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError> {
        Ok(self.tables.read().await.post(id))
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), AppError> {
        let tables = self.tables.read().await;

        let mut posts: Vec<Post> = tables
            .posts
            .values()
            .map(|row| tables.hydrate_post(row))
            .filter(|post| query.matches(post))
            .collect();
        feed::sort_posts(&mut posts, query.sort);

        let total = posts.len() as u64;
        let offset = usize::try_from(query.page.offset()).unwrap_or(usize::MAX);
        let items = posts
            .into_iter()
            .skip(offset)
            .take(query.page.limit() as usize)
            .collect();

        Ok((items, total))
    }

    async fn update_post(
        &self,
        id: i64,
        actor: &Actor,
        input: PostInput,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Post>, AppError> {
        let mut tables = self.tables.write().await;

        let Some(post) = tables.post(id) else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(Some(actor), Resource::Post(&post), Action::Edit, now);
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        let Some(row) = tables.posts.get_mut(&id) else {
            return Ok(Mutation::NotFound);
        };
        row.title = input.title;
        row.text = input.text;
        row.image = input.image;
        if let Some(pub_date) = input.pub_date {
            row.pub_date = pub_date;
        }
        if let Some(is_published) = input.is_published {
            row.is_published = is_published;
        }
        row.category_id = input.category_id;
        row.location_id = input.location_id;

        Ok(tables.post(id).map_or(Mutation::NotFound, Mutation::Applied))
    }

    async fn delete_post(&self, id: i64, actor: &Actor, now: DateTime<Utc>) -> Result<Mutation<()>, AppError> {
        let mut tables = self.tables.write().await;

        let Some(post) = tables.post(id) else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(Some(actor), Resource::Post(&post), Action::Delete, now);
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        tables.posts.remove(&id);
        tables.comments.retain(|_, c| c.post_id != id);
        Ok(Mutation::Applied(()))
    }

    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|row| tables.hydrate_comment(row))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn find_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, AppError> {
        Ok(self.tables.read().await.comment_on(post_id, comment_id))
    }

    async fn create_comment(
        &self,
        post_id: i64,
        actor: &Actor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Comment>, AppError> {
        let mut tables = self.tables.write().await;

        let Some(post) = tables.post(post_id) else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(Some(actor), Resource::Post(&post), Action::Comment, now);
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        let id = tables.next_id();
        let row = CommentRow {
            id,
            post_id,
            author_id: actor.id,
            text,
            created_at: now,
        };
        let comment = tables.hydrate_comment(&row);
        tables.comments.insert(id, row);
        Ok(Mutation::Applied(comment))
    }

    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Comment>, AppError> {
        let mut tables = self.tables.write().await;

        let (Some(post), Some(comment)) = (tables.post(post_id), tables.comment_on(post_id, comment_id)) else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(
            Some(actor),
            Resource::Comment { post: &post, comment: &comment },
            Action::Edit,
            now,
        );
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        if let Some(row) = tables.comments.get_mut(&comment_id) {
            row.text = text;
        }
        Ok(tables
            .comment_on(post_id, comment_id)
            .map_or(Mutation::NotFound, Mutation::Applied))
    }

    async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Mutation<()>, AppError> {
        let mut tables = self.tables.write().await;

        let (Some(post), Some(comment)) = (tables.post(post_id), tables.comment_on(post_id, comment_id)) else {
            return Ok(Mutation::NotFound);
        };
        let decision = policy::authorize(
            Some(actor),
            Resource::Comment { post: &post, comment: &comment },
            Action::Delete,
            now,
        );
        if let Some(denied) = Mutation::denied(decision) {
            return Ok(denied);
        }

        tables.comments.remove(&comment_id);
        Ok(Mutation::Applied(()))
    }
}
