use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::context::AppContext;
use crate::database::models::UserView;
use crate::error::ApiError;
use crate::files::IMAGE_CONTENT_TYPES;
use crate::middleware::{ApiResponse, ApiResult, CurrentUser, FormUpload, UploadedFile};

const AVATAR: UploadedFile = UploadedFile::new("file", "FOTO")
    .in_subdir("perfis")
    .only(IMAGE_CONTENT_TYPES);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_path: String,
}

/// GET /me
pub async fn profile(user: CurrentUser) -> ApiResult<UserView> {
    Ok(ApiResponse::success(user.view()))
}

/// PUT /me/password
pub async fn change_password(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    Json(body): Json<PasswordChange>,
) -> ApiResult<UserView> {
    ctx.users
        .change_password(&user, &body.current_password, &body.new_password)
        .await?;
    Ok(ApiResponse::success(user.view()))
}

/// POST /me/avatar - multipart `file`, images only
pub async fn upload_avatar(
    State(ctx): State<AppContext>,
    user: CurrentUser,
    multipart: Multipart,
) -> ApiResult<AvatarResponse> {
    let upload = FormUpload::read(multipart, &ctx.files, &[AVATAR]).await?;
    let path = upload.file(AVATAR.field).ok_or_else(|| ApiError::missing_field(AVATAR.field))?;

    if let Err(e) = ctx.users.set_avatar(&user, &path).await {
        upload.discard(&ctx.files).await;
        return Err(e.into());
    }
    if let Some(previous) = &user.avatar_path {
        ctx.files.discard(previous).await;
    }
    Ok(ApiResponse::success(AvatarResponse { avatar_path: path }))
}
