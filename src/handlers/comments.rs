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
    extract::AppJson,
    handlers::posts::post_url,
    models::comment::{Comment, CommentRequest},
    policy::{self, Action, Resource},
    repository::RepositoryState,
    utils::{html::sanitize_text, jwt::Claims},
};

const COMMENT_NOT_FOUND: &str = "Comment not found";

/// Create a new comment on a post the caller is allowed to read.
#[utoipa::path(
    post,
    path = "/api/posts/{id}/comments",
    tag = "comments",
    params(("id" = i64, Path, description = "Post id")),
    request_body = CommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Post not found"),
    ),
    security(("bearer" = []))
)]
pub async fn create_comment(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<i64>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let actor = claims.actor()?;

    let comment = repo
        .create_comment(post_id, &actor, sanitize_text(&payload.text), Utc::now())
        .await?
        .into_result("Post not found", post_url(post_id))?;
    tracing::info!(post_id, comment_id = comment.id, author = %claims.username, "created comment");

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Edit one's own comment. Anyone else is sent back to the post.
#[utoipa::path(
    put,
    path = "/api/posts/{id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id"),
    ),
    request_body = CommentRequest,
    responses(
        (status = 200, description = "Comment updated", body = Comment),
        (status = 303, description = "Not the author; redirected to the post"),
        (status = 404, description = "Comment not found"),
    ),
    security(("bearer" = []))
)]
pub async fn update_comment(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    AppJson(payload): AppJson<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let now = Utc::now();

    // Ownership and visibility are settled before the payload is looked at.
    let (Some(post), Some(comment)) = (
        repo.find_post(post_id).await?,
        repo.find_comment(post_id, comment_id).await?,
    ) else {
        return Err(AppError::NotFound(COMMENT_NOT_FOUND.to_string()));
    };
    policy::authorize(
        Some(&actor),
        Resource::Comment {
            post: &post,
            comment: &comment,
        },
        Action::Edit,
        now,
    )
    .require(COMMENT_NOT_FOUND, || post_url(post_id))?;

    payload.validate()?;

    let updated = repo
        .update_comment(post_id, comment_id, &actor, sanitize_text(&payload.text), now)
        .await?
        .into_result(COMMENT_NOT_FOUND, post_url(post_id))?;

    Ok(Json(updated))
}

/// Delete one's own comment.
#[utoipa::path(
    delete,
    path = "/api/posts/{id}/comments/{comment_id}",
    tag = "comments",
    params(
        ("id" = i64, Path, description = "Post id"),
        ("comment_id" = i64, Path, description = "Comment id"),
    ),
    responses(
        (status = 204, description = "Comment deleted"),
        (status = 303, description = "Not the author; redirected to the post"),
        (status = 404, description = "Comment not found"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_comment(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;

    repo.delete_comment(post_id, comment_id, &actor, Utc::now())
        .await?
        .into_result(COMMENT_NOT_FOUND, post_url(post_id))?;

    Ok(StatusCode::NO_CONTENT)
}
