use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use revue_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// 10 MiB upload limit for ticket images
pub const MAX_IMAGE_SIZE: usize = 10 * 1024 * 1024;

/// POST /media — accepts raw image bytes (application/octet-stream), saves
/// under the media dir, inserts a DB row, returns { image_id, size }.
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::Validation("empty upload"));
    }

    if bytes.len() > MAX_IMAGE_SIZE {
        return Err(ApiError::Validation("image too large"));
    }

    let image_id = Uuid::new_v4();
    let size = bytes.len() as i64;

    tokio::fs::create_dir_all(&state.media_dir)
        .await
        .map_err(|e| anyhow::anyhow!("create media dir: {}", e))?;

    let file_path = state.media_dir.join(image_id.to_string());
    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| anyhow::anyhow!("write image {}: {}", file_path.display(), e))?;

    // Insert DB record off the async runtime
    let db = state.clone();
    let iid = image_id.to_string();
    let owner_id = claims.sub.to_string();
    tokio::task::spawn_blocking(move || db.db.insert_media(&iid, &owner_id, size, &revue_db::timestamp()))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            image_id,
            size: size as u64,
        }),
    ))
}

/// GET /media/{image_id} — streams back the stored image bytes.
pub async fn download_image(
    State(state): State<AppState>,
    Path(image_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db
        .get_media(&image_id.to_string())?
        .ok_or(ApiError::NotFound("image not found"))?;

    let file_path = state.media_dir.join(image_id.to_string());
    let bytes = tokio::fs::read(&file_path)
        .await
        .map_err(|_| ApiError::NotFound("image not found"))?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}
