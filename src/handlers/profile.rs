use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppError,
    extract::{AppJson, AppQuery},
    feed::{self, FeedOwner, ListScope, PageRequest},
    models::{
        post::{PageParams, PostPage},
        user::{PublicProfile, UpdateProfileRequest, User},
    },
    repository::RepositoryState,
    utils::jwt::{self, Claims},
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileFeed {
    pub profile: PublicProfile,
    pub posts: PostPage,
}

/// A user's profile and posts.
///
/// The owner sees every post they wrote, including drafts and scheduled
/// ones. Everyone else sees only publicly visible posts.
#[utoipa::path(
    get,
    path = "/api/profile/{username}",
    tag = "profile",
    params(("username" = String, Path, description = "Username"), PageParams),
    responses(
        (status = 200, description = "Profile with one page of posts", body = ProfileFeed),
        (status = 404, description = "Unknown user"),
    )
)]
pub async fn get_profile(
    State(repo): State<RepositoryState>,
    claims: Option<Extension<Claims>>,
    Path(username): Path<String>,
    AppQuery(params): AppQuery<PageParams>,
) -> Result<impl IntoResponse, AppError> {
    let viewer = jwt::viewer(claims.as_deref())?;
    let page = PageRequest::from_query(params.page.as_deref())?;

    let feed = feed::list_visible_posts(
        repo.as_ref(),
        &ListScope::Profile(username),
        viewer.as_ref(),
        Utc::now(),
        page,
    )
    .await?;

    match feed.owner {
        FeedOwner::Profile(profile) => Ok(Json(ProfileFeed {
            profile,
            posts: feed.posts,
        })),
        _ => Err(AppError::InternalServerError(
            "profile feed resolved to another owner".to_string(),
        )),
    }
}

/// Get the current user's account.
#[utoipa::path(
    get,
    path = "/api/profile",
    tag = "profile",
    responses((status = 200, description = "Own account", body = User)),
    security(("bearer" = []))
)]
pub async fn get_me(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = repo
        .find_user_by_id(claims.user_id()?)
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}

/// Edit the current user's name and email.
#[utoipa::path(
    put,
    path = "/api/profile",
    tag = "profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Account updated", body = User),
        (status = 400, description = "Validation failed"),
    ),
    security(("bearer" = []))
)]
pub async fn update_me(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = repo
        .update_profile(claims.user_id()?, payload.into())
        .await?
        .ok_or(AppError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
