use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::models::comment::Comment;

/// A row of 'posts' with its author, category and location joined in,
/// plus the number of comments attached to it.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Opaque reference to an uploaded image (URL or media path).
    pub image: Option<String>,

    /// Scheduled publication instant. A future value defers publication.
    pub pub_date: DateTime<Utc>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,

    pub author_id: i64,
    pub author_username: String,

    pub category_id: Option<i64>,
    pub category_slug: Option<String>,
    pub category_title: Option<String>,
    /// `None` when the post has no category.
    pub category_is_published: Option<bool>,

    pub location_id: Option<i64>,
    pub location_name: Option<String>,

    pub comment_count: i64,
}

/// Publication state, derived from the post's fields on every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PostState {
    /// `is_published` is off.
    Draft,
    /// Published, but the category is hidden.
    Delisted,
    /// Published, `pub_date` still in the future.
    Scheduled,
    Live,
}

impl Post {
    pub fn state(&self, now: DateTime<Utc>) -> PostState {
        if !self.is_published {
            PostState::Draft
        } else if self.category_is_published == Some(false) {
            PostState::Delisted
        } else if self.pub_date > now {
            PostState::Scheduled
        } else {
            PostState::Live
        }
    }
}

/// Accepts an absolute http(s) URL or a relative media path.
pub fn validate_image_ref(image: &str) -> Result<(), ValidationError> {
    let valid = match url::Url::parse(image) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => {
            !image.is_empty()
                && !image.starts_with('/')
                && !image.split('/').any(|segment| segment == "..")
                && image
                    .chars()
                    .all(|c| c.is_alphanumeric() || matches!(c, '/' | '.' | '-' | '_'))
        }
    };

    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_image");
        error.message = Some("Image must be an http(s) URL or a relative media path.".into());
        Err(error)
    }
}

/// DTO for creating or editing a post.
///
/// On create, a missing `pub_date` means "now" and a missing
/// `is_published` means `true`. On edit, missing values keep what is
/// stored. `category_id`, `location_id` and `image` are always replaced.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PostRequest {
    #[validate(length(
        min = 1,
        max = 256,
        message = "Title length must be between 1 and 256 chars"
    ))]
    pub title: String,

    #[validate(length(
        min = 1,
        max = 20000,
        message = "Text length must be between 1 and 20000 chars"
    ))]
    pub text: String,

    #[validate(length(max = 512), custom(function = "validate_image_ref"))]
    pub image: Option<String>,

    pub pub_date: Option<DateTime<Utc>>,
    pub is_published: Option<bool>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
}

/// Validated post fields handed to the repository.
#[derive(Debug, Clone)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub image: Option<String>,
    pub pub_date: Option<DateTime<Utc>>,
    pub is_published: Option<bool>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
}

/// Query parameters for every paginated feed.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// 1-based page number (default: 1).
    #[param(value_type = Option<u32>)]
    pub page: Option<String>,
}

/// One page of a feed.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostPage {
    pub items: Vec<Post>,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

/// A single post with its comments, oldest first.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostDetail {
    #[serde(flatten)]
    pub post: Post,
    pub state: PostState,
    pub comments: Vec<Comment>,
}
