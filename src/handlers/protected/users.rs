use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::database::models::UserView;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::permissions::{self, PermissionEntry};
use crate::types::{Resource, Role};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct RoleProfile {
    pub role: Role,
    pub description: &'static str,
    pub resources: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct Profiles {
    pub roles: Vec<RoleProfile>,
    pub permissions: Vec<PermissionEntry>,
}

/// GET /users
pub async fn list(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<Vec<UserView>> {
    user.require(Resource::Usuarios)?;
    Ok(ApiResponse::success(ctx.users.list().await?))
}

/// POST /users
pub async fn create(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Json(body): Json<CreateUserRequest>,
) -> ApiResult<UserView> {
    user.require(Resource::Usuarios)?;
    let created = ctx
        .users
        .create(&user, &body.username, &body.password, body.role.as_deref())
        .await?;
    Ok(ApiResponse::created(created.view()))
}

/// DELETE /users/:id
pub async fn delete(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Value> {
    user.require(Resource::Usuarios)?;
    ctx.users.delete(&user, id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}

/// PUT /users/:id/role
pub async fn update_role(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<RoleChange>,
) -> ApiResult<UserView> {
    user.require(Resource::Usuarios)?;
    let updated = ctx.users.update_role(&user, id, &body.role).await?;
    Ok(ApiResponse::success(updated.view()))
}

/// GET /users/profiles - role descriptions plus the permission table
pub async fn profiles(user: CurrentUser) -> ApiResult<Profiles> {
    user.require(Resource::Usuarios)?;
    let roles = Role::ALL
        .iter()
        .map(|&role| RoleProfile {
            role,
            description: role.description(),
            resources: permissions::PERMISSIONS
                .iter()
                .filter(|(_, roles)| roles.contains(&role))
                .map(|(tag, _)| *tag)
                .collect(),
        })
        .collect();
    Ok(ApiResponse::success(Profiles { roles, permissions: permissions::table() }))
}
