//! PostgreSQL implementation of the verification store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use veriface_core::{DecidedBy, DossierStatus};

use super::{
    DocumentRecord, DossierRecord, DossierTransition, NewDocument, NewPhoto, NewRequester,
    PhotoRecord, RequesterRecord, StoreError, VerificationStore,
};

/// PostgreSQL-backed verification store.
///
/// The `photos.fingerprint` unique index is the authoritative dedup
/// guard; the application-level check is only a fast path.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct RequesterRow {
    id: Uuid,
    name: String,
    api_key: String,
    callback_url: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<RequesterRow> for RequesterRecord {
    fn from(row: RequesterRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            api_key: row.api_key,
            callback_url: row.callback_url,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct PhotoRow {
    id: Uuid,
    original_name: String,
    stored_name: String,
    byte_size: i64,
    media_type: String,
    path: String,
    fingerprint: Option<String>,
    biometric: bool,
    created_at: DateTime<Utc>,
}

impl From<PhotoRow> for PhotoRecord {
    fn from(row: PhotoRow) -> Self {
        Self {
            id: row.id,
            original_name: row.original_name,
            stored_name: row.stored_name,
            byte_size: row.byte_size,
            media_type: row.media_type,
            path: row.path,
            fingerprint: row.fingerprint,
            biometric: row.biometric,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    original_name: String,
    stored_name: String,
    byte_size: i64,
    media_type: String,
    path: String,
    created_at: DateTime<Utc>,
}

impl From<DocumentRow> for DocumentRecord {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: row.id,
            original_name: row.original_name,
            stored_name: row.stored_name,
            byte_size: row.byte_size,
            media_type: row.media_type,
            path: row.path,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct DossierRow {
    id: Uuid,
    status: String,
    decided_by: Option<String>,
    observation: Option<String>,
    audit_log: String,
    photo_id: Uuid,
    document_id: Uuid,
    requester_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<DossierRow> for DossierRecord {
    type Error = StoreError;

    fn try_from(row: DossierRow) -> Result<Self, StoreError> {
        let status = DossierStatus::parse(&row.status)
            .ok_or_else(|| StoreError::Query(format!("unknown dossier status {}", row.status)))?;
        let decided_by = match row.decided_by.as_deref() {
            None => None,
            Some(s) => Some(DecidedBy::parse(s).ok_or_else(|| {
                StoreError::Query(format!("unknown decided_by value {s}"))
            })?),
        };
        Ok(Self {
            id: row.id,
            status,
            decided_by,
            observation: row.observation,
            audit_log: row.audit_log,
            photo_id: row.photo_id,
            document_id: row.document_id,
            requester_id: row.requester_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            decided_at: row.decided_at,
        })
    }
}

impl PostgresStore {
    /// Create a new store with the given database URL.
    ///
    /// Runs migrations automatically on connection.
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Migration(e.to_string()))?;

        tracing::info!("Verification store connected and migrations applied");

        Ok(Self { pool })
    }

    /// Create a store from an existing pool (for testing).
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db) = e {
        if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation) {
            return StoreError::DuplicateFingerprint;
        }
    }
    StoreError::Query(e.to_string())
}

#[async_trait]
impl VerificationStore for PostgresStore {
    async fn create_requester(&self, input: NewRequester) -> Result<RequesterRecord, StoreError> {
        let row: RequesterRow = sqlx::query_as(
            r#"
            INSERT INTO requesters (name, api_key, callback_url)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(&input.name)
        .bind(&input.api_key)
        .bind(&input.callback_url)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn requester(&self, id: Uuid) -> Result<Option<RequesterRecord>, StoreError> {
        let row: Option<RequesterRow> =
            sqlx::query_as("SELECT * FROM requesters WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn requester_by_api_key(
        &self,
        key: &str,
    ) -> Result<Option<RequesterRecord>, StoreError> {
        let row: Option<RequesterRow> =
            sqlx::query_as("SELECT * FROM requesters WHERE api_key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn create_photo(&self, input: NewPhoto) -> Result<PhotoRecord, StoreError> {
        let row: PhotoRow = sqlx::query_as(
            r#"
            INSERT INTO photos (
                original_name, stored_name, byte_size, media_type,
                path, fingerprint, biometric
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&input.original_name)
        .bind(&input.stored_name)
        .bind(input.byte_size)
        .bind(&input.media_type)
        .bind(&input.path)
        .bind(&input.fingerprint)
        .bind(input.biometric)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn photo(&self, id: Uuid) -> Result<Option<PhotoRecord>, StoreError> {
        let row: Option<PhotoRow> = sqlx::query_as("SELECT * FROM photos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn photo_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<PhotoRecord>, StoreError> {
        let row: Option<PhotoRow> =
            sqlx::query_as("SELECT * FROM photos WHERE fingerprint = $1")
                .bind(fingerprint)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn create_document(&self, input: NewDocument) -> Result<DocumentRecord, StoreError> {
        let row: DocumentRow = sqlx::query_as(
            r#"
            INSERT INTO documents (original_name, stored_name, byte_size, media_type, path)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&input.original_name)
        .bind(&input.stored_name)
        .bind(input.byte_size)
        .bind(&input.media_type)
        .bind(&input.path)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        Ok(row.into())
    }

    async fn document(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        let row: Option<DocumentRow> = sqlx::query_as("SELECT * FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(row.map(Into::into))
    }

    async fn create_dossier(
        &self,
        photo_id: Uuid,
        document_id: Uuid,
        requester_id: Uuid,
        audit_log: &str,
    ) -> Result<DossierRecord, StoreError> {
        let row: DossierRow = sqlx::query_as(
            r#"
            INSERT INTO dossiers (status, audit_log, photo_id, document_id, requester_id)
            VALUES ('PENDING', $1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(audit_log)
        .bind(photo_id)
        .bind(document_id)
        .bind(requester_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx)?;
        row.try_into()
    }

    async fn dossier(&self, id: Uuid) -> Result<Option<DossierRecord>, StoreError> {
        let row: Option<DossierRow> = sqlx::query_as("SELECT * FROM dossiers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;
        row.map(TryInto::try_into).transpose()
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        transition: DossierTransition,
    ) -> Result<DossierRecord, StoreError> {
        let row: Option<DossierRow> = sqlx::query_as(
            r#"
            UPDATE dossiers
            SET status = $2,
                decided_by = $3,
                observation = COALESCE($4, observation),
                audit_log = $5,
                decided_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(transition.status.as_str())
        .bind(transition.decided_by.as_str())
        .bind(&transition.observation)
        .bind(&transition.audit_log)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }
}
