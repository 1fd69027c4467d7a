//! File-serving handlers
//!
//! Streams stored photo and document bytes back with their recorded
//! content type and an inline disposition, for the review surface.

use std::path::Path as FsPath;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Fetch a stored photo
#[utoipa::path(
    get,
    path = "/view/photo/{id}",
    tag = "Files",
    params(
        ("id" = String, Path, description = "Photo id")
    ),
    responses(
        (status = 200, description = "Photo bytes"),
        (status = 404, description = "Photo not found")
    )
)]
pub async fn view_photo_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    let record = state
        .store
        .photo(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Photo not found"))?;
    serve(&state, &record.path, &record.media_type, &record.original_name).await
}

/// Fetch a stored document
#[utoipa::path(
    get,
    path = "/view/document/{id}",
    tag = "Files",
    params(
        ("id" = String, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Document bytes"),
        (status = 404, description = "Document not found")
    )
)]
pub async fn view_document_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    let record = state
        .store
        .document(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Document not found"))?;
    serve(&state, &record.path, &record.media_type, &record.original_name).await
}

async fn serve(
    state: &AppState,
    path: &str,
    media_type: &str,
    original_name: &str,
) -> Result<(HeaderMap, Vec<u8>), ApiError> {
    let bytes = state.artifacts.read(FsPath::new(path)).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(media_type)
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    let disposition = format!("inline; filename=\"{}\"", original_name.replace('"', ""));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or(HeaderValue::from_static("inline")),
    );

    Ok((headers, bytes))
}
