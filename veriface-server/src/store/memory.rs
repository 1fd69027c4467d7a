//! In-memory verification store for development and tests.
//!
//! Check-then-insert on the fingerprint index runs under one mutex,
//! matching the serialization the Postgres unique index provides.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use veriface_core::DossierStatus;

use super::{
    DocumentRecord, DossierRecord, DossierTransition, NewDocument, NewPhoto, NewRequester,
    PhotoRecord, RequesterRecord, StoreError, VerificationStore,
};

#[derive(Default)]
struct Inner {
    requesters: HashMap<Uuid, RequesterRecord>,
    photos: HashMap<Uuid, PhotoRecord>,
    documents: HashMap<Uuid, DocumentRecord>,
    dossiers: HashMap<Uuid, DossierRecord>,
}

/// In-memory store (state is lost on restart).
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panicked writer; the data is still
        // the best we have for an in-memory dev store.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn create_requester(&self, input: NewRequester) -> Result<RequesterRecord, StoreError> {
        let record = RequesterRecord {
            id: Uuid::new_v4(),
            name: input.name,
            api_key: input.api_key,
            callback_url: input.callback_url,
            created_at: Utc::now(),
        };
        self.lock().requesters.insert(record.id, record.clone());
        Ok(record)
    }

    async fn requester(&self, id: Uuid) -> Result<Option<RequesterRecord>, StoreError> {
        Ok(self.lock().requesters.get(&id).cloned())
    }

    async fn requester_by_api_key(
        &self,
        key: &str,
    ) -> Result<Option<RequesterRecord>, StoreError> {
        Ok(self
            .lock()
            .requesters
            .values()
            .find(|r| r.api_key == key)
            .cloned())
    }

    async fn create_photo(&self, input: NewPhoto) -> Result<PhotoRecord, StoreError> {
        let mut inner = self.lock();
        if let Some(fp) = &input.fingerprint {
            if inner
                .photos
                .values()
                .any(|p| p.fingerprint.as_deref() == Some(fp.as_str()))
            {
                return Err(StoreError::DuplicateFingerprint);
            }
        }
        let record = PhotoRecord {
            id: Uuid::new_v4(),
            original_name: input.original_name,
            stored_name: input.stored_name,
            byte_size: input.byte_size,
            media_type: input.media_type,
            path: input.path,
            fingerprint: input.fingerprint,
            biometric: input.biometric,
            created_at: Utc::now(),
        };
        inner.photos.insert(record.id, record.clone());
        Ok(record)
    }

    async fn photo(&self, id: Uuid) -> Result<Option<PhotoRecord>, StoreError> {
        Ok(self.lock().photos.get(&id).cloned())
    }

    async fn photo_by_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<PhotoRecord>, StoreError> {
        Ok(self
            .lock()
            .photos
            .values()
            .find(|p| p.fingerprint.as_deref() == Some(fingerprint))
            .cloned())
    }

    async fn create_document(&self, input: NewDocument) -> Result<DocumentRecord, StoreError> {
        let record = DocumentRecord {
            id: Uuid::new_v4(),
            original_name: input.original_name,
            stored_name: input.stored_name,
            byte_size: input.byte_size,
            media_type: input.media_type,
            path: input.path,
            created_at: Utc::now(),
        };
        self.lock().documents.insert(record.id, record.clone());
        Ok(record)
    }

    async fn document(&self, id: Uuid) -> Result<Option<DocumentRecord>, StoreError> {
        Ok(self.lock().documents.get(&id).cloned())
    }

    async fn create_dossier(
        &self,
        photo_id: Uuid,
        document_id: Uuid,
        requester_id: Uuid,
        audit_log: &str,
    ) -> Result<DossierRecord, StoreError> {
        let now = Utc::now();
        let record = DossierRecord {
            id: Uuid::new_v4(),
            status: DossierStatus::Pending,
            decided_by: None,
            observation: None,
            audit_log: audit_log.to_string(),
            photo_id,
            document_id,
            requester_id,
            created_at: now,
            updated_at: now,
            decided_at: None,
        };
        self.lock().dossiers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn dossier(&self, id: Uuid) -> Result<Option<DossierRecord>, StoreError> {
        Ok(self.lock().dossiers.get(&id).cloned())
    }

    async fn apply_transition(
        &self,
        id: Uuid,
        transition: DossierTransition,
    ) -> Result<DossierRecord, StoreError> {
        let mut inner = self.lock();
        let record = inner.dossiers.get_mut(&id).ok_or(StoreError::NotFound)?;
        let now = Utc::now();
        record.status = transition.status;
        record.decided_by = Some(transition.decided_by);
        if transition.observation.is_some() {
            record.observation = transition.observation;
        }
        record.audit_log = transition.audit_log;
        record.decided_at = Some(now);
        record.updated_at = now;
        Ok(record.clone())
    }
}
