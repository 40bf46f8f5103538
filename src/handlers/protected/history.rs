use axum::extract::State;

use crate::context::AppContext;
use crate::database::models::AuditLogEntry;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::permissions::{self, PermissionEntry};
use crate::types::Resource;

/// GET /logs - full audit trail, newest first
pub async fn logs(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<Vec<AuditLogEntry>> {
    user.require(Resource::Logs)?;
    let entries = ctx.audit.recent(ctx.config.audit.history_limit).await?;
    Ok(ApiResponse::success(entries))
}

/// GET /historico - business history; non-admins only see contract, invoice and telephony entries
pub async fn history(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<Vec<AuditLogEntry>> {
    user.require(Resource::Historico)?;
    let entries = ctx.audit.history_for(&user.role, ctx.config.audit.history_limit).await?;
    Ok(ApiResponse::success(entries))
}

/// GET /permissions
pub async fn permissions(_user: CurrentUser) -> ApiResult<Vec<PermissionEntry>> {
    Ok(ApiResponse::success(permissions::table()))
}
