use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::database::models::Credential;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::credentials::CredentialInput;
use crate::types::Resource;

/// GET /credenciais
pub async fn list(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<Vec<Credential>> {
    user.require(Resource::Credenciais)?;
    Ok(ApiResponse::success(ctx.credentials.list_active().await?))
}

/// POST /credenciais
pub async fn create(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Json(input): Json<CredentialInput>,
) -> ApiResult<Credential> {
    user.require(Resource::CredenciaisGestao)?;
    Ok(ApiResponse::created(ctx.credentials.create(&user, input).await?))
}

/// PUT /credenciais/:id
pub async fn update(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CredentialInput>,
) -> ApiResult<Credential> {
    user.require(Resource::CredenciaisGestao)?;
    Ok(ApiResponse::success(ctx.credentials.update(&user, id, input).await?))
}

/// DELETE /credenciais/:id
pub async fn delete(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Value> {
    user.require(Resource::CredenciaisGestao)?;
    ctx.credentials.delete(&user, id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}
