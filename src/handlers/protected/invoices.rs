use axum::{
    extract::{Multipart, Path, State},
    Json,
};

use crate::context::AppContext;
use crate::database::models::Invoice;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, FormUpload, UploadedFile};
use crate::services::invoices::{InvoiceInput, StatusChange};
use crate::services::ServiceError;
use crate::types::Resource;

const BILL: UploadedFile = UploadedFile::new("file", "BOLETO");
const FISCAL_NOTE: UploadedFile = UploadedFile::new("fiscalNote", "NF");

/// GET /faturas - active invoices
pub async fn list(State(ctx): State<AppContext>, user: CurrentUser) -> ApiResult<Vec<Invoice>> {
    user.require(Resource::Faturas)?;
    Ok(ApiResponse::success(ctx.invoices.list_active().await?))
}

/// POST /faturas - multipart form, `file` required, `fiscalNote` optional
pub async fn create(State(ctx): State<AppContext>, user: CurrentUser, multipart: Multipart) -> ApiResult<Invoice> {
    user.require(Resource::Faturas)?;
    let upload = FormUpload::read(multipart, &ctx.files, &[BILL, FISCAL_NOTE]).await?;

    let result: Result<Invoice, ServiceError> = async {
        let input = InvoiceInput::from_fields(&upload.fields)?;
        let bill = upload
            .file(BILL.field)
            .ok_or_else(|| ServiceError::invalid(BILL.field, "This field is required"))?;
        ctx.invoices.create(&user, input, bill, upload.file(FISCAL_NOTE.field)).await
    }
    .await;

    match result {
        Ok(invoice) => Ok(ApiResponse::created(invoice)),
        Err(e) => {
            upload.discard(&ctx.files).await;
            Err(e.into())
        }
    }
}

/// PUT /faturas/:id - multipart form; files are replaced only when sent
pub async fn update(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<Invoice> {
    user.require(Resource::Faturas)?;
    let upload = FormUpload::read(multipart, &ctx.files, &[BILL, FISCAL_NOTE]).await?;

    let result = match InvoiceInput::from_fields(&upload.fields) {
        Ok(input) => {
            ctx.invoices
                .update(&user, id, input, upload.file(BILL.field), upload.file(FISCAL_NOTE.field))
                .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(invoice) => Ok(ApiResponse::success(invoice)),
        Err(e) => {
            upload.discard(&ctx.files).await;
            Err(e.into())
        }
    }
}

/// PUT /faturas/:id/status
pub async fn update_status(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(change): Json<StatusChange>,
) -> ApiResult<Invoice> {
    user.require(Resource::Faturas)?;
    Ok(ApiResponse::success(ctx.invoices.update_status(&user, id, change).await?))
}

/// PUT /faturas/:id/inativar
pub async fn deactivate(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Invoice> {
    user.require(Resource::Faturas)?;
    Ok(ApiResponse::success(ctx.invoices.set_active(&user, id, false).await?))
}

/// PUT /faturas/:id/ativar
pub async fn activate(State(ctx): State<AppContext>, user: CurrentUser, Path(id): Path<i64>) -> ApiResult<Invoice> {
    user.require(Resource::Faturas)?;
    Ok(ApiResponse::success(ctx.invoices.set_active(&user, id, true).await?))
}
