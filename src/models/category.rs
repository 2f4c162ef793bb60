// src/models/category.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("slug pattern is valid"));

/// Latin letters, digits, hyphen and underscore.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_slug");
        error.message = Some(
            "Slug may contain only latin letters, digits, hyphens and underscores.".into(),
        );
        Err(error)
    }
}

/// Represents the 'categories' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// URL identifier. Unique, and never changed after creation.
    pub slug: String,
    pub is_published: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for creating a new category.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 256, message = "Title length must be between 1 and 256 chars"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[validate(
        length(min = 1, max = 64, message = "Slug length must be between 1 and 64 chars"),
        custom(function = "validate_slug")
    )]
    pub slug: String,

    pub is_published: Option<bool>,
}

/// DTO for editing a category. Slugs cannot be changed.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 256, message = "Title length must be between 1 and 256 chars"))]
    pub title: String,

    #[serde(default)]
    pub description: String,

    pub is_published: bool,
}
