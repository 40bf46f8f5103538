use axum::extract::{Multipart, Path, State};
use serde_json::{json, Value};

use crate::context::AppContext;
use crate::database::models::Contract;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, FormUpload, UploadedFile};
use crate::services::contracts::ContractInput;
use crate::types::Resource;

const ATTACHMENT: UploadedFile = UploadedFile::new("file", "CONTRATO");

/// GET /contratos - active contracts, newest first
pub async fn list(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<Vec<Contract>> {
    user.require(Resource::Contratos)?;
    Ok(ApiResponse::success(ctx.contracts.list_active().await?))
}

/// POST /contratos - multipart form, optional `file`
pub async fn create(State(ctx): State<AppContext>, user: CurrentUser, multipart: Multipart) -> ApiResult<Contract> {
    user.require(Resource::Contratos)?;
    let upload = FormUpload::read(multipart, &ctx.files, &[ATTACHMENT]).await?;

    let result = match ContractInput::from_fields(&upload.fields) {
        Ok(input) => ctx.contracts.create(&user, input, upload.file(ATTACHMENT.field)).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(contract) => Ok(ApiResponse::created(contract)),
        Err(e) => {
            upload.discard(&ctx.files).await;
            Err(e.into())
        }
    }
}

/// PUT /contratos/:id - multipart form; the attachment is replaced only when a new `file` is sent
pub async fn update(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Contract> {
    user.require(Resource::Contratos)?;
    let upload = FormUpload::read(multipart, &ctx.files, &[ATTACHMENT]).await?;

    let result = match ContractInput::from_fields(&upload.fields) {
        Ok(input) => ctx.contracts.update(&user, id, input, upload.file(ATTACHMENT.field)).await,
        Err(e) => Err(e),
    };
    match result {
        Ok(contract) => Ok(ApiResponse::success(contract)),
        Err(e) => {
            upload.discard(&ctx.files).await;
            Err(e.into())
        }
    }
}

/// DELETE /contratos/:id
pub async fn delete(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Value> {
    user.require(Resource::Contratos)?;
    ctx.contracts.delete(&user, id).await?;
    Ok(ApiResponse::success(json!({ "deleted": id })))
}

/// PUT /contratos/:id/inativar
pub async fn deactivate(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Contract> {
    user.require(Resource::Contratos)?;
    Ok(ApiResponse::success(ctx.contracts.set_active(&user, id, false).await?))
}

/// PUT /contratos/:id/ativar
pub async fn activate(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Contract> {
    user.require(Resource::Contratos)?;
    Ok(ApiResponse::success(ctx.contracts.set_active(&user, id, true).await?))
}
