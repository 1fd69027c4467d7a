//! Upload validation module
//!
//! Provides validation utilities for multipart file uploads.

use crate::error::ApiError;

/// MIME types accepted for the selfie photo
const PHOTO_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// MIME types accepted for the identity document
const DOCUMENT_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// Validates the Content-Type of the selfie photo.
///
/// Only raster image formats the recognition model can decode are
/// accepted; a missing Content-Type is rejected.
pub fn validate_photo_type(content_type: Option<&str>) -> Result<(), ApiError> {
    validate_against(content_type, PHOTO_MIME_TYPES, "photo")
}

/// Validates the Content-Type of the identity document.
///
/// Accepts the photo formats plus PDF.
pub fn validate_document_type(content_type: Option<&str>) -> Result<(), ApiError> {
    validate_against(content_type, DOCUMENT_MIME_TYPES, "document")
}

fn validate_against(
    content_type: Option<&str>,
    allowed: &[&str],
    field: &str,
) -> Result<(), ApiError> {
    match content_type {
        Some(ct) if allowed.contains(&ct.to_lowercase().as_str()) => Ok(()),
        Some(ct) => Err(ApiError::bad_request(format!(
            "Unsupported Content-Type for {field}: '{ct}'. Allowed: {}",
            allowed.join(", ")
        ))),
        None => Err(ApiError::bad_request(format!(
            "Missing Content-Type for {field}"
        ))),
    }
}

/// Validates the size of an uploaded file.
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ApiError> {
    if size > max_size {
        let max_mb = max_size / (1024 * 1024);
        Err(ApiError::bad_request(format!(
            "File too large: {} bytes exceeds maximum of {} MB",
            size, max_mb
        )))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_types() {
        assert!(validate_photo_type(Some("image/jpeg")).is_ok());
        assert!(validate_photo_type(Some("IMAGE/PNG")).is_ok());
        assert!(validate_photo_type(Some("image/webp")).is_ok());
        assert!(validate_photo_type(Some("application/pdf")).is_err());
        assert!(validate_photo_type(Some("video/mp4")).is_err());
        assert!(validate_photo_type(None).is_err());
    }

    #[test]
    fn test_document_types() {
        assert!(validate_document_type(Some("application/pdf")).is_ok());
        assert!(validate_document_type(Some("image/png")).is_ok());
        assert!(validate_document_type(Some("text/plain")).is_err());
    }

    #[test]
    fn test_file_size() {
        assert!(validate_file_size(100, 1024).is_ok());
        assert!(validate_file_size(1024, 1024).is_ok());
        assert!(validate_file_size(1025, 1024).is_err());
    }
}
