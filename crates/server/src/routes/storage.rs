use axum::{
    Router,
    extract::{Multipart, Path, State},
    response::Json as ResponseJson,
    routing::post,
};
use services::services::storage::StoredFile;
use utils::response::ApiResponse;

use crate::{DeploymentImpl, error::ApiError};

/// First file field of a multipart body as `(filename, bytes)`.
pub async fn read_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), ApiError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await?;
        return Ok((filename, bytes.to_vec()));
    }
    Err(ApiError::BadRequest("no file in upload".into()))
}

/// Upload a file into a storage bucket
pub async fn upload(
    State(deployment): State<DeploymentImpl>,
    Path(bucket): Path<String>,
    multipart: Multipart,
) -> Result<ResponseJson<ApiResponse<StoredFile>>, ApiError> {
    let (filename, bytes) = read_upload(multipart).await?;
    let stored = deployment.storage().upload(&bucket, &filename, &bytes).await?;
    Ok(ResponseJson(ApiResponse::success(stored)))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route("/storage/{bucket}", post(upload))
}
