//! Upload handler
//!
//! Handles POST /upload requests: two multipart files (selfie photo
//! and identity document) run through the verification pipeline.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::Requester;
use crate::error::ApiError;
use crate::multipart::UploadForm;
use crate::pipeline::UploadOutcome;
use crate::state::AppState;

/// Response for an upload
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    /// Human-readable summary of the outcome
    #[schema(example = "Verification started")]
    pub message: String,
    pub data: UploadData,
}

/// Upload outcome data: a new dossier, or a duplicate rejection that
/// carries the pre-existing photo id instead of a dossier id.
#[derive(Serialize, ToSchema)]
pub struct UploadData {
    /// Dossier id (absent on duplicate rejection)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub id: Option<String>,
    /// Dossier status after the automated pass
    #[schema(example = "PENDING")]
    pub status: String,
    /// Dossier creation timestamp (absent on duplicate rejection)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create: Option<String>,
    /// Rejection reason (duplicate rejection only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Id of the previously stored photo that matched (duplicate rejection only)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub original_image_id: Option<String>,
}

/// Run a verification attempt
///
/// Accepts multipart/form-data with:
/// - **photo** (required): selfie image (JPEG/PNG/WebP)
/// - **document** (required): identity document (image or PDF)
///
/// An exact-duplicate selfie is rejected without creating a dossier;
/// the response then carries the original photo id instead.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "Verification",
    request_body(
        content_type = "multipart/form-data",
        description = "Selfie photo and identity document"
    ),
    responses(
        (status = 200, description = "Dossier opened or duplicate rejected", body = UploadResponse),
        (status = 400, description = "Missing file or unsupported format"),
        (status = 401, description = "Missing or invalid API key"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_handler(
    State(state): State<AppState>,
    Requester(requester): Requester,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let form = UploadForm::parse(&mut multipart, state.config.max_file_size()).await?;

    let outcome = state
        .pipeline
        .process_upload(&requester, form.photo, form.document)
        .await?;

    let response = match outcome {
        UploadOutcome::Processed(dossier) => UploadResponse {
            message: "Verification started".to_string(),
            data: UploadData {
                id: Some(dossier.id.to_string()),
                status: dossier.status.to_string(),
                create: Some(dossier.created_at.to_rfc3339()),
                reason: None,
                original_image_id: None,
            },
        },
        UploadOutcome::Duplicate { original_photo_id } => UploadResponse {
            message: "Duplicate selfie rejected".to_string(),
            data: UploadData {
                id: None,
                status: "REJECTED".to_string(),
                create: None,
                reason: Some("A photo with this fingerprint already exists".to_string()),
                original_image_id: Some(original_photo_id.to_string()),
            },
        },
    };

    Ok(Json(response))
}
