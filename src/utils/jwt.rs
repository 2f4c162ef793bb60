// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::User, policy::Actor};

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    pub username: String,
    /// 'admin' for superusers, 'user' otherwise.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Result<i64, AppError> {
        self.sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }

    pub fn actor(&self) -> Result<Actor, AppError> {
        Ok(Actor {
            id: self.user_id()?,
            is_superuser: self.role == ROLE_ADMIN,
        })
    }
}

/// Resolves an optional `Claims` extension into the viewer of a read request.
pub fn viewer(claims: Option<&Claims>) -> Result<Option<Actor>, AppError> {
    claims.map(Claims::actor).transpose()
}

/// Signs a new JWT for the user.
pub fn sign_jwt(user: &User, secret: &str, expiration_seconds: u64) -> Result<String, AppError> {
    // Calculate expiration: current time + expiration_seconds
    let expiration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize
        + expiration_seconds as usize;

    let role = if user.is_superuser { ROLE_ADMIN } else { ROLE_USER };

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: role.to_owned(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Identification.
///
/// A valid 'Authorization: Bearer <token>' header injects `Claims` into the
/// request extensions. With no header the request goes through anonymously.
/// A malformed or invalid token is 401.
pub async fn identify_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::AuthError("Malformed authorization header".to_string()))
        })
        .transpose()?;

    if let Some(header) = auth_header {
        let token = header
            .strip_prefix("Bearer ")
            .ok_or(AppError::AuthError("Expected a Bearer token".to_string()))?;

        let claims = verify_jwt(token, &config.jwt_secret)?;
        req.extensions_mut().insert(claims);
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Authentication.
///
/// Must be used AFTER `identify_middleware`. Rejects anonymous requests with 401.
pub async fn auth_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    if req.extensions().get::<Claims>().is_none() {
        return Err(AppError::AuthError("Login required".to_string()));
    }

    Ok(next.run(req).await)
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `identify_middleware`. Anonymous requests are 401,
/// non-superusers 403.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(AppError::AuthError("Login required".to_string()))?;

    if claims.role != ROLE_ADMIN {
        tracing::debug!(username = %claims.username, "admin route refused");
        return Err(AppError::Forbidden("Superuser access required".to_string()));
    }

    Ok(next.run(req).await)
}
