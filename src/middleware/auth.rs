use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::ops::Deref;
use tracing::warn;

use crate::auth::validate_jwt;
use crate::context::AppContext;
use crate::database::models::User;
use crate::error::ApiError;
use crate::permissions::authorize;
use crate::types::Resource;

/// Authenticated user, reloaded from storage on every request.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    /// Check the permission table before any handler logic runs.
    pub fn require(&self, resource: Resource) -> Result<(), ApiError> {
        authorize(&self.0.role, resource.tag()).map_err(|denied| {
            warn!(username = %self.0.username, role = %self.0.role, resource = %denied.tag, "Access denied");
            ApiError::from(denied)
        })
    }
}

impl Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &User {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Not authenticated"))
    }
}

/// JWT authentication middleware: validates the bearer token and loads the user it names
pub async fn jwt_auth_middleware(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;
    let user = authenticate(&ctx, &token).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Caller identity on public routes: `None` without an Authorization header,
/// an error when one is present but invalid.
pub async fn optional_user(ctx: &AppContext, headers: &HeaderMap) -> Result<Option<User>, ApiError> {
    if !headers.contains_key(axum::http::header::AUTHORIZATION) {
        return Ok(None);
    }
    let token = extract_jwt_from_headers(headers).map_err(ApiError::unauthorized)?;
    authenticate(ctx, &token).await.map(Some)
}

async fn authenticate(ctx: &AppContext, token: &str) -> Result<User, ApiError> {
    let claims = validate_jwt(token, &ctx.config.security)?;
    match ctx.users.find_by_username(&claims.sub).await? {
        Some(user) if user.active => Ok(user),
        _ => Err(ApiError::unauthorized("Invalid or expired token")),
    }
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err("Empty JWT token".to_string()),
        None => Err("Authorization header must use Bearer token format".to_string()),
    }
}
