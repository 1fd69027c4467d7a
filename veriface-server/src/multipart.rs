//! Multipart form parsing helpers
//!
//! Parses the two-file upload form (selfie photo plus identity
//! document) out of a multipart/form-data request, validating each
//! file's Content-Type and size as it streams in.

use axum::extract::Multipart;

use crate::error::ApiError;
use crate::pipeline::UploadFile;
use crate::validation::{validate_document_type, validate_file_size, validate_photo_type};

/// The parsed upload form: both files are required.
#[derive(Debug)]
pub struct UploadForm {
    pub photo: UploadFile,
    pub document: UploadFile,
}

impl UploadForm {
    /// Parse the `photo` and `document` file fields from a multipart
    /// request. Unknown fields are ignored.
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut photo: Option<UploadFile> = None;
        let mut document: Option<UploadFile> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {}", e)))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "photo" | "document" => {
                    let content_type = field.content_type().map(|s| s.to_string());
                    if name == "photo" {
                        validate_photo_type(content_type.as_deref())?;
                    } else {
                        validate_document_type(content_type.as_deref())?;
                    }

                    let original_name = field
                        .file_name()
                        .filter(|n| !n.is_empty())
                        .unwrap_or("upload.bin")
                        .to_string();

                    let data = field
                        .bytes()
                        .await
                        .map_err(|e| {
                            ApiError::bad_request(format!("Failed to read {name}: {e}"))
                        })?
                        .to_vec();
                    validate_file_size(data.len(), max_file_size)?;

                    let file = UploadFile {
                        original_name,
                        // Content-Type presence was just validated
                        media_type: content_type.unwrap_or_default(),
                        data,
                    };
                    if name == "photo" {
                        photo = Some(file);
                    } else {
                        document = Some(file);
                    }
                }
                _ => {
                    // Drain and ignore unknown fields
                    let _ = field.bytes().await;
                }
            }
        }

        let photo = photo.ok_or_else(|| {
            ApiError::bad_request("No photo provided. Use 'photo' field in multipart form.")
        })?;
        let document = document.ok_or_else(|| {
            ApiError::bad_request("No document provided. Use 'document' field in multipart form.")
        })?;

        Ok(Self { photo, document })
    }
}
