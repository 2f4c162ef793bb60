use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppError,
    extract::AppQuery,
    feed::{self, FeedOwner, ListScope, PageRequest},
    models::{
        category::Category,
        post::{PageParams, PostPage},
    },
    repository::RepositoryState,
    utils::jwt::{self, Claims},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryFeed {
    pub category: Category,
    pub posts: PostPage,
}

/// Publicly visible posts of a published category.
#[utoipa::path(
    get,
    path = "/api/categories/{slug}",
    tag = "categories",
    params(("slug" = String, Path, description = "Category slug"), PageParams),
    responses(
        (status = 200, description = "Category with one page of its posts", body = CategoryFeed),
        (status = 404, description = "Unknown or unpublished category"),
    )
)]
pub async fn get_category(
    State(repo): State<RepositoryState>,
    claims: Option<Extension<Claims>>,
    Path(slug): Path<String>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = jwt::viewer(claims.as_deref())?;
    let page = PageRequest::from_query(params.page.as_deref())?;

    let feed = feed::list_visible_posts(
        repo.as_ref(),
        &ListScope::Category(slug),
        viewer.as_ref(),
        Utc::now(),
        page,
    )
    .await?;

    match feed.owner {
        FeedOwner::Category(category) => Ok(Json(CategoryFeed {
            category,
            posts: feed.posts,
        })),
        _ => Err(AppError::InternalServerError(
            "category feed resolved to another owner".to_string(),
        )),
    }
}
