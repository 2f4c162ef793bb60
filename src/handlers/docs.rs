use axum::Json;
use utoipa::{
    Modify, OpenApi,
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};

use crate::{
    handlers::{admin, auth, categories, comments, posts, profile},
    models,
};

/// Aggregates every annotated handler and schema into one OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::register, auth::login,
        posts::list_posts, posts::create_post, posts::get_post, posts::update_post, posts::delete_post,
        comments::create_comment, comments::update_comment, comments::delete_comment,
        categories::get_category,
        profile::get_profile, profile::get_me, profile::update_me,
        admin::create_category, admin::update_category, admin::delete_category,
        admin::create_location, admin::update_location, admin::delete_location,
    ),
    components(schemas(
        models::user::User, models::user::PublicProfile, models::user::CreateUserRequest,
        models::user::LoginRequest, models::user::UpdateProfileRequest,
        models::category::Category, models::category::CreateCategoryRequest,
        models::category::UpdateCategoryRequest,
        models::location::Location, models::location::LocationRequest,
        models::post::Post, models::post::PostState, models::post::PostRequest,
        models::post::PostPage, models::post::PostDetail,
        models::comment::Comment, models::comment::CommentRequest,
        categories::CategoryFeed, profile::ProfileFeed,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "blogicum", description = "Blogicum blogging API")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Serves the generated OpenAPI document as JSON.
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
