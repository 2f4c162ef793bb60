// src/repository/mod.rs

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppError,
    feed::PostQuery,
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        comment::Comment,
        location::{Location, LocationRequest},
        post::{Post, PostInput},
        user::{NewUser, ProfileChanges, User},
    },
    policy::{Actor, Decision},
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PgRepository;

/// Result of a guarded write: the repository reads the row, runs the
/// policy check and writes within one transaction.
#[derive(Debug)]
pub enum Mutation<T> {
    Applied(T),
    NotFound,
    Redirect,
}

impl<T> Mutation<T> {
    /// `None` when the decision allows the write to proceed.
    pub fn denied(decision: Decision) -> Option<Self> {
        match decision {
            Decision::Allow => None,
            Decision::DenyAsRedirect => Some(Mutation::Redirect),
            Decision::DenyAsNotFound => Some(Mutation::NotFound),
        }
    }

    pub fn into_result(self, not_found: &str, redirect_to: String) -> Result<T, AppError> {
        match self {
            Mutation::Applied(value) => Ok(value),
            Mutation::NotFound => Err(AppError::NotFound(not_found.to_string())),
            Mutation::Redirect => Err(AppError::Redirect(redirect_to)),
        }
    }
}

/// Persistence contract for users, categories, locations, posts and comments.
///
/// Posts are always returned with author, category and location joined in
/// and their comment count attached. Deleting a category or a location
/// detaches its posts; deleting a post removes its comments.
#[async_trait]
pub trait BlogRepository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<Option<User>, AppError>;

    // --- Categories ---
    async fn create_category(&self, req: CreateCategoryRequest) -> Result<Category, AppError>;
    async fn find_category_by_id(&self, id: i64) -> Result<Option<Category>, AppError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError>;
    async fn update_category(&self, id: i64, req: UpdateCategoryRequest) -> Result<Option<Category>, AppError>;
    async fn delete_category(&self, id: i64) -> Result<bool, AppError>;

    // --- Locations ---
    async fn create_location(&self, req: LocationRequest) -> Result<Location, AppError>;
    async fn find_location(&self, id: i64) -> Result<Option<Location>, AppError>;
    async fn update_location(&self, id: i64, req: LocationRequest) -> Result<Option<Location>, AppError>;
    async fn delete_location(&self, id: i64) -> Result<bool, AppError>;

    // --- Posts ---
    async fn create_post(&self, author_id: i64, input: PostInput, now: DateTime<Utc>) -> Result<Post, AppError>;
    async fn find_post(&self, id: i64) -> Result<Option<Post>, AppError>;
    /// One page of posts plus the total number matching the query.
    async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64), AppError>;
    /// Author only.
    async fn update_post(
        &self,
        id: i64,
        actor: &Actor,
        input: PostInput,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Post>, AppError>;
    /// Author or superuser. Removes the post's comments too.
    async fn delete_post(&self, id: i64, actor: &Actor, now: DateTime<Utc>) -> Result<Mutation<()>, AppError>;

    // --- Comments ---
    /// Oldest first.
    async fn list_comments(&self, post_id: i64) -> Result<Vec<Comment>, AppError>;
    /// A comment id that belongs to a different post is not found.
    async fn find_comment(&self, post_id: i64, comment_id: i64) -> Result<Option<Comment>, AppError>;
    /// Requires the actor to be able to view the post.
    async fn create_comment(
        &self,
        post_id: i64,
        actor: &Actor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Comment>, AppError>;
    /// Comment author only.
    async fn update_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        text: String,
        now: DateTime<Utc>,
    ) -> Result<Mutation<Comment>, AppError>;
    /// Comment author only.
    async fn delete_comment(
        &self,
        post_id: i64,
        comment_id: i64,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Mutation<()>, AppError>;
}

/// The shared handle stored in the application state.
pub type RepositoryState = Arc<dyn BlogRepository>;
