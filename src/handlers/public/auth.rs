// handlers/public/auth.rs - token acquisition and registration

use axum::{extract::State, http::HeaderMap, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::AppContext;
use crate::error::ApiError;
use crate::middleware::{optional_user, ApiResponse, ApiResult};
use crate::services::users::Session;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// OAuth2-style token body.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub role: String,
    pub username: String,
    #[serde(rename = "avatarPath")]
    pub avatar_path: Option<String>,
}

impl From<Session> for TokenResponse {
    fn from(session: Session) -> Self {
        Self {
            access_token: session.token,
            token_type: "bearer",
            role: session.user.role,
            username: session.user.username,
            avatar_path: session.user.avatar_path,
        }
    }
}

/// POST /token - form login (`username`, `password`)
pub async fn token(
    State(ctx): State<AppContext>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let session = ctx.users.login(form.username.trim(), &form.password).await?;
    info!(username = %session.user.username, "User logged in");
    Ok(Json(session.into()))
}

/// POST /register - open while no user exists, admin-only afterwards
pub async fn register(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<TokenResponse> {
    let actor = optional_user(&ctx, &headers).await?;
    let session = ctx.users.register(actor.as_ref(), &body.username, &body.password).await?;
    Ok(ApiResponse::created(session.into()))
}
