//! Upload handlers

use axum::{
    extract::{FromRequestParts, Multipart, Path, State},
    http::{request::Parts, StatusCode},
    Json,
};
use shared::{RiskAssessment, Upload, UploadOutcome, UploadSummary};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::CurrentUser;
use crate::services::upload::NewUpload;
use crate::AppState;

/// `:upload_id` path segment; a malformed id is a validation error
pub struct UploadId(pub Uuid);

#[axum::async_trait]
impl<S> FromRequestParts<S> for UploadId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(upload_id) = Path::<Uuid>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::field("upload_id", "Invalid upload id"))?;
        Ok(UploadId(upload_id))
    }
}

fn multipart_error(e: impl std::fmt::Display) -> AppError {
    AppError::ValidationError(format!("Multipart error: {}", e))
}

/// Upload a leaf image
///
/// Multipart fields: `file` (required), `title`, `latitude`, `longitude`, `days`.
pub async fn create_upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadOutcome>), AppError> {
    let mut input = NewUpload::default();
    let mut has_file = false;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => {
                input.filename = field.file_name().unwrap_or("upload").to_string();
                input.bytes = field.bytes().await.map_err(multipart_error)?.to_vec();
                has_file = true;
            }
            Some("title") => input.title = Some(field.text().await.map_err(multipart_error)?),
            Some("latitude") => input.latitude = Some(field.text().await.map_err(multipart_error)?),
            Some("longitude") => {
                input.longitude = Some(field.text().await.map_err(multipart_error)?)
            }
            Some("days") => input.days = Some(field.text().await.map_err(multipart_error)?),
            _ => {}
        }
    }

    if !has_file {
        return Err(AppError::field("file", "Missing file in multipart form"));
    }

    let outcome = state.upload_service().create(user.farmer_id, input).await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// The current farmer's uploads, newest first
pub async fn list_uploads(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Upload>>, AppError> {
    let uploads = state.upload_service().list(user.farmer_id).await?;
    Ok(Json(uploads))
}

/// Public feed of recent classified uploads
pub async fn recent_uploads(
    State(state): State<AppState>,
) -> Result<Json<Vec<UploadSummary>>, AppError> {
    let uploads = state.upload_service().recent().await?;
    Ok(Json(uploads))
}

pub async fn get_upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    UploadId(upload_id): UploadId,
) -> Result<Json<Upload>, AppError> {
    let upload = state.upload_service().get(user.farmer_id, upload_id).await?;
    Ok(Json(upload))
}

pub async fn get_upload_risk(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    UploadId(upload_id): UploadId,
) -> Result<Json<RiskAssessment>, AppError> {
    let risk = state.upload_service().risk(user.farmer_id, upload_id).await?;
    Ok(Json(risk))
}

pub async fn delete_upload(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    UploadId(upload_id): UploadId,
) -> Result<StatusCode, AppError> {
    state.upload_service().delete(user.farmer_id, upload_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
