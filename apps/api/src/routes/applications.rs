use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::AppError;
use crate::models::application::{Application, StatusRow, SubmitApplication, UpdateStatus};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

/// Whether the confirmation mail went out after the application was stored.
/// `Failed` still means the application itself was saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Sent,
    Failed,
}

#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub data: Application,
    pub confirmation_email: ConfirmationStatus,
}

/// GET /
pub async fn handle_root() -> Json<Value> {
    Json(json!({ "message": "Welcome to my API" }))
}

/// GET /posts
pub async fn handle_list(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<Vec<Application>>>, AppError> {
    let data = state
        .bounded("database", state.store.list_applications())
        .await?;
    Ok(Json(DataResponse { data }))
}

/// GET /post/:id
pub async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DataResponse<Application>>, AppError> {
    let data = state
        .bounded("database", state.store.get_application(id))
        .await?;
    Ok(Json(DataResponse { data }))
}

/// POST /post
pub async fn handle_submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitApplication>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    req.validate()?;

    // Not wrapped in `bounded`: the store times out the inserts but never the
    // COMMIT, so a stored application always gets its 201 and its mail.
    let application = state.store.submit_application(&req).await?;

    // The application is committed at this point; a mail failure is reported
    // alongside it instead of failing the request.
    let confirmation_email = match state
        .bounded(
            "mail relay",
            state
                .mailer
                .send_confirmation(&application.email, &application.display_name()),
        )
        .await
    {
        Ok(()) => ConfirmationStatus::Sent,
        Err(e) => {
            warn!(
                "Application {} stored but confirmation email failed: {e}",
                application.id
            );
            ConfirmationStatus::Failed
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(SubmissionResponse {
            data: application,
            confirmation_email,
        }),
    ))
}

/// PUT /post/:id
///
/// `id` is a status id (`status_id` in the application view), not the
/// personal_info id that `GET` and `DELETE` on the same path take.
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateStatus>,
) -> Result<Json<DataResponse<StatusRow>>, AppError> {
    req.validate()?;
    let data = state
        .bounded("database", state.store.update_status(id, &req))
        .await?;
    Ok(Json(DataResponse { data }))
}

/// DELETE /post/:id
pub async fn handle_delete(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<DataResponse<Application>>, AppError> {
    let data = state
        .bounded("database", state.store.delete_application(id))
        .await?;
    Ok(Json(DataResponse { data }))
}
