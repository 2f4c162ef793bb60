// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, categories, comments, docs, posts, profile},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, identify_middleware},
};

/// Assembles the main application router.
///
/// * Read routes accept anonymous viewers; write routes require a token.
/// * Every request outside `/api/auth` passes `identify_middleware`, so
///   handlers see `Claims` whenever a valid token was sent. Login and
///   register ignore the Authorization header.
/// * Applies global middleware (Trace, CORS).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));

    let post_routes = Router::new()
        .route("/", get(posts::list_posts))
        .route("/{id}", get(posts::get_post))
        // Protected post routes
        .merge(
            Router::new()
                .route("/", post(posts::create_post))
                .route("/{id}", put(posts::update_post).delete(posts::delete_post))
                .route("/{id}/comments", post(comments::create_comment))
                .route(
                    "/{id}/comments/{comment_id}",
                    put(comments::update_comment).delete(comments::delete_comment),
                )
                .route_layer(middleware::from_fn(auth_middleware)),
        );

    let category_routes = Router::new().route("/{slug}", get(categories::get_category));

    let profile_routes = Router::new()
        .route("/{username}", get(profile::get_profile))
        .merge(
            Router::new()
                .route("/", get(profile::get_me).put(profile::update_me))
                .route_layer(middleware::from_fn(auth_middleware)),
        );

    let admin_routes = Router::new()
        .route("/categories", post(admin::create_category))
        .route(
            "/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route("/locations", post(admin::create_location))
        .route(
            "/locations/{id}",
            put(admin::update_location).delete(admin::delete_location),
        )
        .route_layer(middleware::from_fn(admin_middleware));

    let api_routes = Router::new()
        .nest("/api/posts", post_routes)
        .nest("/api/categories", category_routes)
        .nest("/api/profile", profile_routes)
        .nest("/api/admin", admin_routes)
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            identify_middleware,
        ));

    Router::new()
        .nest("/api/auth", auth_routes)
        .merge(api_routes)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
