use axum::extract::State;

use crate::context::AppContext;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::dashboard::{DashboardStats, DashboardSummary};
use crate::types::Resource;

/// GET /dashboard
pub async fn summary(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<DashboardSummary> {
    user.require(Resource::Dashboard)?;
    Ok(ApiResponse::success(ctx.dashboard.summary(&user).await?))
}

/// GET /dashboard/stats
pub async fn stats(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<DashboardStats> {
    user.require(Resource::Dashboard)?;
    Ok(ApiResponse::success(ctx.dashboard.stats().await?))
}
