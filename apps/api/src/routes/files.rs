use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::AppError;
use crate::storage::{storage_key, KEY_PREFIX};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Metadata of a stored upload, shaped like the `file` object accepted by
/// `POST /post` plus the storage key.
#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub key: String,
    pub name: String,
    pub size: i64,
    #[serde(rename = "type")]
    pub content_type: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub data: UploadedFile,
}

/// POST /uploadfile/
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::Validation("Uploaded file has no filename".to_string()))?;
        let content_type = field
            .content_type()
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        let size = bytes.len() as i64;

        let key = state
            .bounded(
                "object storage",
                state.files.put(&name, Some(content_type.as_str()), bytes),
            )
            .await?;

        return Ok(Json(UploadResponse {
            message: "File uploaded successfully",
            data: UploadedFile {
                key,
                name,
                size,
                content_type,
            },
        }));
    }

    Err(AppError::Validation(format!(
        "Multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// GET /downloadfile/:name
pub async fn handle_download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let key = storage_key(&name)?;
    let object = state
        .bounded("object storage", state.files.get(&key))
        .await?;

    let filename = object.key.trim_start_matches(KEY_PREFIX).replace('"', "");
    let content_type = object
        .content_type
        .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        object.bytes,
    )
        .into_response())
}
