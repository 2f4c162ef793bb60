use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, AppQuery},
    feed::{self, ListScope, PageRequest},
    models::post::{PageParams, PostDetail, PostInput, PostPage, PostRequest},
    policy::{self, Action, Resource},
    repository::{BlogRepository, RepositoryState},
    utils::{
        html::sanitize_text,
        jwt::{self, Claims},
    },
};

const POST_NOT_FOUND: &str = "Post not found";

pub fn post_url(id: i64) -> String {
    format!("/api/posts/{id}")
}

/// Validates the payload and the category/location it points at.
pub(crate) async fn resolve_post_input(
    repo: &dyn BlogRepository,
    payload: PostRequest,
) -> Result<PostInput, AppError> {
    payload.validate()?;

    if let Some(category_id) = payload.category_id {
        if repo.find_category_by_id(category_id).await?.is_none() {
            return Err(AppError::field(
                "category_id",
                "unknown_category",
                "Select a valid category.",
            ));
        }
    }
    if let Some(location_id) = payload.location_id {
        if repo.find_location(location_id).await?.is_none() {
            return Err(AppError::field(
                "location_id",
                "unknown_location",
                "Select a valid location.",
            ));
        }
    }

    Ok(PostInput {
        title: payload.title,
        text: sanitize_text(&payload.text),
        image: payload.image,
        pub_date: payload.pub_date,
        is_published: payload.is_published,
        category_id: payload.category_id,
        location_id: payload.location_id,
    })
}

/// Home feed: every publicly visible post, newest first.
#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(PageParams),
    responses(
        (status = 200, description = "One page of the home feed", body = PostPage),
        (status = 404, description = "Page out of range"),
    )
)]
pub async fn list_posts(
    State(repo): State<RepositoryState>,
    claims: Option<Extension<Claims>>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = jwt::viewer(claims.as_deref())?;
    let page = PageRequest::from_query(params.page.as_deref())?;

    let feed = feed::list_visible_posts(
        repo.as_ref(),
        &ListScope::Home,
        viewer.as_ref(),
        Utc::now(),
        page,
    )
    .await?;

    Ok(Json(feed.posts))
}

/// Create a new post. The caller becomes its author.
#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    request_body = PostRequest,
    responses(
        (status = 201, description = "Post created", body = crate::models::post::Post),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not logged in"),
    ),
    security(("bearer" = []))
)]
pub async fn create_post(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author_id = claims.user_id()?;
    let input = resolve_post_input(repo.as_ref(), payload).await?;

    let post = repo.create_post(author_id, input, Utc::now()).await?;
    tracing::info!(post_id = post.id, author_id, author = %claims.username, "created post");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Get a single post with its comments.
/// Hidden posts look exactly like missing ones to everyone but their author.
#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 200, description = "Post with comments", body = PostDetail),
        (status = 404, description = "Post not found"),
    )
)]
pub async fn get_post(
    State(repo): State<RepositoryState>,
    claims: Option<Extension<Claims>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = jwt::viewer(claims.as_deref())?;
    let now = Utc::now();

    let post = repo
        .find_post(id)
        .await?
        .ok_or(AppError::NotFound(POST_NOT_FOUND.to_string()))?;

    policy::authorize(viewer.as_ref(), Resource::Post(&post), Action::View, now)
        .require(POST_NOT_FOUND, || post_url(id))?;

    let comments = repo.list_comments(id).await?;
    let state = post.state(now);

    Ok(Json(PostDetail {
        post,
        state,
        comments,
    }))
}

/// Edit a post. Anyone but the author is sent back to the post.
#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    request_body = PostRequest,
    responses(
        (status = 200, description = "Post updated", body = crate::models::post::Post),
        (status = 303, description = "Not the author; redirected to the post"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Post not found or hidden from the caller"),
    ),
    security(("bearer" = []))
)]
pub async fn update_post(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<PostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let now = Utc::now();

    // Ownership is checked before the payload, so strangers are bounced
    // even when what they sent is invalid.
    let post = repo
        .find_post(id)
        .await?
        .ok_or(AppError::NotFound(POST_NOT_FOUND.to_string()))?;
    policy::authorize(Some(&actor), Resource::Post(&post), Action::Edit, now)
        .require(POST_NOT_FOUND, || post_url(id))
        .inspect_err(|_| tracing::debug!(post_id = id, actor_id = actor.id, "edit denied"))?;

    let input = resolve_post_input(repo.as_ref(), payload).await?;
    let updated = repo
        .update_post(id, &actor, input, now)
        .await?
        .into_result(POST_NOT_FOUND, post_url(id))?;

    Ok(Json(updated))
}

/// Delete a post and its comments (Author OR Superuser).
#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    params(("id" = i64, Path, description = "Post id")),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 303, description = "Not allowed; redirected to the post"),
        (status = 404, description = "Post not found or hidden from the caller"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_post(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;

    repo.delete_post(id, &actor, Utc::now())
        .await?
        .into_result(POST_NOT_FOUND, post_url(id))
        .inspect_err(|_| tracing::debug!(post_id = id, actor_id = actor.id, "delete denied"))?;

    tracing::info!(post_id = id, actor_id = actor.id, actor = %claims.username, "deleted post");
    Ok(StatusCode::NO_CONTENT)
}
