//! Application state module
//!
//! Defines shared state accessible across all request handlers.

use std::sync::Arc;

use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::storage::ArtifactStore;
use crate::store::VerificationStore;

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Verification store (Postgres or in-memory)
    pub store: Arc<dyn VerificationStore>,
    /// The verification pipeline
    pub pipeline: Arc<Pipeline>,
    /// Artifact store for serving stored files
    pub artifacts: ArtifactStore,
    /// Whether a working match evaluator is wired into the pipeline
    /// (false means every dossier escalates to human review)
    pub evaluator_configured: bool,
}
