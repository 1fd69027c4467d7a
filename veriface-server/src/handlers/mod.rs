//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod dossier;
pub mod files;
pub mod health;
pub mod upload;

pub use crate::state::AppState;
pub use dossier::{
    decision_handler, get_dossier_handler, DecisionRequest, DecisionResponse, DossierResponse,
};
pub use files::{view_document_handler, view_photo_handler};
pub use health::{health, HealthResponse};
pub use upload::{upload_handler, UploadData, UploadResponse};
