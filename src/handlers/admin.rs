// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    extract::AppJson,
    models::{
        category::{Category, CreateCategoryRequest, UpdateCategoryRequest},
        location::{Location, LocationRequest},
    },
    repository::RepositoryState,
};

/// Creates a category.
/// Superuser only.
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    tag = "admin",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Category created", body = Category),
        (status = 409, description = "Slug taken"),
    ),
    security(("bearer" = []))
)]
pub async fn create_category(
    State(repo): State<RepositoryState>,
    AppJson(payload): AppJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = repo.create_category(payload).await?;
    tracing::info!(category_id = category.id, "created category {}", category.slug);

    Ok((StatusCode::CREATED, Json(category)))
}

/// Edits a category's title, description and publication flag.
/// Superuser only.
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Category id")),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = Category),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer" = []))
)]
pub async fn update_category(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let category = repo
        .update_category(id, payload)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    Ok(Json(category))
}

/// Deletes a category. Its posts stay, without a category.
/// Superuser only.
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Category id")),
    responses(
        (status = 204, description = "Category deleted"),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_category(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !repo.delete_category(id).await? {
        return Err(AppError::NotFound("Category not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Creates a location.
/// Superuser only.
#[utoipa::path(
    post,
    path = "/api/admin/locations",
    tag = "admin",
    request_body = LocationRequest,
    responses((status = 201, description = "Location created", body = Location)),
    security(("bearer" = []))
)]
pub async fn create_location(
    State(repo): State<RepositoryState>,
    AppJson(payload): AppJson<LocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let location = repo.create_location(payload).await?;

    Ok((StatusCode::CREATED, Json(location)))
}

/// Updates a location.
/// Superuser only.
#[utoipa::path(
    put,
    path = "/api/admin/locations/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Location id")),
    request_body = LocationRequest,
    responses(
        (status = 200, description = "Location updated", body = Location),
        (status = 404, description = "Location not found"),
    ),
    security(("bearer" = []))
)]
pub async fn update_location(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
    AppJson(payload): AppJson<LocationRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let location = repo
        .update_location(id, payload)
        .await?
        .ok_or(AppError::NotFound("Location not found".to_string()))?;

    Ok(Json(location))
}

/// Deletes a location. Its posts stay, without a location.
/// Superuser only.
#[utoipa::path(
    delete,
    path = "/api/admin/locations/{id}",
    tag = "admin",
    params(("id" = i64, Path, description = "Location id")),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 404, description = "Location not found"),
    ),
    security(("bearer" = []))
)]
pub async fn delete_location(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !repo.delete_location(id).await? {
        return Err(AppError::NotFound("Location not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
