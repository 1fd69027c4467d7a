//! Verification store module
//!
//! Persistence boundary for requesters, photos, documents and
//! dossiers. Two backends implement the same trait:
//! - **PostgreSQL** (production): enforces the fingerprint uniqueness
//!   constraint in the database, the authoritative dedup guard.
//! - **In-memory** (development/tests): serializes check-then-insert
//!   behind a mutex so the same race cannot slip through.
//!
//! If `DATABASE_URL` is not set, the server falls back to the
//! in-memory backend (state is lost on restart).

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use veriface_core::{DecidedBy, DossierStatus};

/// Storage errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(String),

    #[error("Database migration error: {0}")]
    Migration(String),

    #[error("Query error: {0}")]
    Query(String),

    /// A photo with this fingerprint already exists (uniqueness guard).
    #[error("Duplicate fingerprint")]
    DuplicateFingerprint,

    #[error("Record not found")]
    NotFound,
}

/// Caller identity, resolved once per request by the auth extractor.
#[derive(Debug, Clone)]
pub struct RequesterRecord {
    pub id: Uuid,
    pub name: String,
    pub api_key: String,
    /// Webhook notified on every dossier transition, when set.
    pub callback_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// DTO for registering a requester.
#[derive(Debug, Clone)]
pub struct NewRequester {
    pub name: String,
    pub api_key: String,
    pub callback_url: Option<String>,
}

/// Stored selfie photo metadata. Immutable once created.
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub byte_size: i64,
    pub media_type: String,
    pub path: String,
    /// Canonical fingerprint encoding; None when extraction and the
    /// fallback both failed.
    pub fingerprint: Option<String>,
    /// False when the fingerprint is the content-hash fallback.
    pub biometric: bool,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a photo record.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub original_name: String,
    pub stored_name: String,
    pub byte_size: i64,
    pub media_type: String,
    pub path: String,
    pub fingerprint: Option<String>,
    pub biometric: bool,
}

/// Stored identity document metadata. Immutable once created.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub original_name: String,
    pub stored_name: String,
    pub byte_size: i64,
    pub media_type: String,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

/// DTO for creating a document record.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub original_name: String,
    pub stored_name: String,
    pub byte_size: i64,
    pub media_type: String,
    pub path: String,
}

/// Verification dossier: one attempt's lifecycle and outcome.
#[derive(Debug, Clone)]
pub struct DossierRecord {
    pub id: Uuid,
    pub status: DossierStatus,
    pub decided_by: Option<DecidedBy>,
    pub observation: Option<String>,
    /// Append-only timestamped log; never truncated or rewritten.
    pub audit_log: String,
    pub photo_id: Uuid,
    pub document_id: Uuid,
    pub requester_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// A status/reviewer transition to persist on a dossier.
#[derive(Debug, Clone)]
pub struct DossierTransition {
    pub status: DossierStatus,
    pub decided_by: DecidedBy,
    pub observation: Option<String>,
    /// Full audit log after the append (computed by the caller from
    /// the current record, so the store never rewrites history).
    pub audit_log: String,
}

/// Persistence backend for the verification pipeline.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn create_requester(&self, input: NewRequester) -> Result<RequesterRecord, StoreError>;
    async fn requester(&self, id: Uuid) -> Result<Option<RequesterRecord>, StoreError>;
    async fn requester_by_api_key(&self, key: &str)
        -> Result<Option<RequesterRecord>, StoreError>;

    /// Insert a photo record. Fails with
    /// [`StoreError::DuplicateFingerprint`] when another photo already
    /// holds the same fingerprint (uniqueness constraint).
    async fn create_photo(&self, input: NewPhoto) -> Result<PhotoRecord, StoreError>;
    async fn photo(&self, id: Uuid) -> Result<Option<PhotoRecord>, StoreError>;

    /// Exact-equality dedup lookup on the canonical encoding.
    async fn photo_by_fingerprint(&self, fingerprint: &str)
        -> Result<Option<PhotoRecord>, StoreError>;

    async fn create_document(&self, input: NewDocument) -> Result<DocumentRecord, StoreError>;
    async fn document(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError>;

    /// Create a dossier in PENDING with its initial audit line.
    async fn create_dossier(
        &self,
        photo_id: Uuid,
        document_id: Uuid,
        requester_id: Uuid,
        audit_log: &str,
    ) -> Result<DossierRecord, StoreError>;
    async fn dossier(&self, id: Uuid) -> Result<Option<DossierRecord>, StoreError>;

    /// Persist a transition. Fails with [`StoreError::NotFound`] when
    /// the dossier does not exist.
    async fn apply_transition(
        &self,
        id: Uuid,
        transition: DossierTransition,
    ) -> Result<DossierRecord, StoreError>;
}
