//! Veriface Server Library - REST API for selfie/document verification
//!
//! This library exposes the server components for use in integration tests.
//! The main binary uses these same components.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod multipart;
pub mod notify;
pub mod openapi;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
pub mod validation;

pub use auth::Requester;
pub use config::Config;
pub use error::ApiError;
pub use notify::{HttpNotifier, Notifier, NotifyError, RecordingNotifier, StatusNotification};
pub use openapi::ApiDoc;
pub use pipeline::{Pipeline, PipelineSettings, UploadFile, UploadOutcome};
pub use routes::create_router;
pub use state::AppState;
pub use storage::{ArtifactKind, ArtifactStore, SavedArtifact};
pub use store::{
    DocumentRecord, DossierRecord, DossierTransition, MemoryStore, NewDocument, NewPhoto,
    NewRequester, PhotoRecord, PostgresStore, RequesterRecord, StoreError, VerificationStore,
};
