use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::database::models::PhoneLine;
use crate::error::ApiError;
use crate::ingest::{Dialect, ImportSummary};
use crate::middleware::{ApiResponse, ApiResult, CurrentUser};
use crate::services::telephony::PhoneLineInput;
use crate::types::Resource;

#[derive(Debug, Default, Deserialize)]
pub struct LineQuery {
    #[serde(default, alias = "operadora")]
    pub carrier: Option<String>,
    #[serde(default, alias = "mes")]
    pub period: Option<String>,
}

/// GET /telefonia?carrier=&period=
pub async fn list(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Query(query): Query<LineQuery>,
) -> ApiResult<Vec<PhoneLine>> {
    user.require(Resource::Telefonia)?;
    let lines = ctx
        .telephony
        .list(query.carrier.as_deref(), query.period.as_deref())
        .await?;
    Ok(ApiResponse::success(lines))
}

/// POST /telefonia
pub async fn create(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Json(input): Json<PhoneLineInput>,
) -> ApiResult<PhoneLine> {
    user.require(Resource::Telefonia)?;
    Ok(ApiResponse::created(ctx.telephony.create(&user, input).await?))
}

/// PUT /telefonia/:id
pub async fn update(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<PhoneLineInput>,
) -> ApiResult<PhoneLine> {
    user.require(Resource::Telefonia)?;
    Ok(ApiResponse::success(ctx.telephony.update(&user, id, input).await?))
}

/// DELETE /telefonia/:id
pub async fn delete(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Value> {
    user.require(Resource::Telefonia)?;
    ctx.telephony.delete(&user, id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}

/// POST /telefonia/upload/tim - carrier export, replaces (Tim, period)
pub async fn upload_carrier(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    user.require(Resource::Telefonia)?;
    import(&ctx, &user, Dialect::Carrier, multipart).await
}

/// POST /telefonia/upload/inventario - inventory spreadsheet, replaces every carrier for the period
pub async fn upload_inventory(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    user.require(Resource::Telefonia)?;
    import(&ctx, &user, Dialect::Inventory, multipart).await
}

async fn import(
    ctx: &AppContext,
    user: &CurrentUser,
    dialect: Dialect,
    mut multipart: Multipart,
) -> Result<Json<ImportSummary>, ApiError> {
    let mut period = None;
    let mut contents = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name().unwrap_or_default() {
            "referencePeriod" | "mes_referencia" => period = Some(field.text().await?),
            "file" | "arquivo" => contents = Some(field.bytes().await?),
            _ => {}
        }
    }

    let contents = contents.ok_or_else(|| ApiError::missing_field("file"))?;
    let period = period.unwrap_or_default();
    let summary = ctx
        .importer
        .import(&user.username, dialect, &period, &contents)
        .await?;
    Ok(Json(summary))
}
