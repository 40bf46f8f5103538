pub mod auth;
pub mod multipart;
pub mod response;

pub use auth::{jwt_auth_middleware, optional_user, CurrentUser};
pub use multipart::{FormUpload, UploadedFile};
pub use response::{ApiResponse, ApiResult};
