//! Verification pipeline module
//!
//! Orchestrates one verification attempt end to end: persist both
//! artifacts, fingerprint the selfie, reject exact duplicates before
//! any dossier exists, run the vision evaluator, apply the decision
//! policy and notify the requester. Every step appends to the
//! dossier's audit log; the log is never truncated.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use veriface_core::{
    append_audit, audit_entry, decide, DecidedBy, Decision, DossierStatus, Fingerprint,
    FingerprintExtractor, MatchEvaluator, MatchVerdict,
};

use crate::error::ApiError;
use crate::notify::{Notifier, StatusNotification};
use crate::storage::{ArtifactKind, ArtifactStore, SavedArtifact};
use crate::store::{
    DossierRecord, DossierTransition, NewDocument, NewPhoto, RequesterRecord, StoreError,
    VerificationStore,
};

/// An uploaded file, already read out of the multipart body.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub original_name: String,
    pub media_type: String,
    pub data: Vec<u8>,
}

/// Outcome of an upload: either a dossier was opened, or the selfie
/// was an exact duplicate and nothing beyond the rejection is kept.
#[derive(Debug)]
pub enum UploadOutcome {
    Processed(DossierRecord),
    Duplicate { original_photo_id: Uuid },
}

/// Pipeline settings carried over from the server config.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub review_webhook_url: Option<String>,
    pub public_base_url: String,
    pub allow_redecision: bool,
}

pub struct Pipeline {
    store: Arc<dyn VerificationStore>,
    artifacts: ArtifactStore,
    extractor: Arc<dyn FingerprintExtractor>,
    evaluator: Arc<dyn MatchEvaluator>,
    notifier: Arc<dyn Notifier>,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn VerificationStore>,
        artifacts: ArtifactStore,
        extractor: Arc<dyn FingerprintExtractor>,
        evaluator: Arc<dyn MatchEvaluator>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            artifacts,
            extractor,
            evaluator,
            notifier,
            settings,
        }
    }

    /// Run a full verification attempt for an authenticated requester.
    pub async fn process_upload(
        &self,
        requester: &RequesterRecord,
        photo: UploadFile,
        document: UploadFile,
    ) -> Result<UploadOutcome, ApiError> {
        let saved_photo = self
            .artifacts
            .save(ArtifactKind::Photo, &photo.original_name, &photo.data)
            .await?;
        let saved_document = self
            .artifacts
            .save(ArtifactKind::Document, &document.original_name, &document.data)
            .await?;

        // Fingerprint the selfie; a failed extraction falls back to a
        // content hash so dedup still catches byte-identical resubmits.
        let (fingerprint, degraded_note) = match self.extractor.extract(&photo.data).await {
            Ok(descriptor) => (Fingerprint::Descriptor(descriptor), None),
            Err(e) => {
                tracing::warn!(error = %e, "Fingerprint extraction failed, using content hash");
                (
                    Fingerprint::content_hash(&photo.data),
                    Some(format!("Fingerprint degraded to content hash: {e}")),
                )
            }
        };
        let encoded = fingerprint.encode();

        // Fast-path dedup check before creating any record.
        if let Some(existing) = self.store.photo_by_fingerprint(&encoded).await? {
            return self
                .reject_duplicate(existing.id, &saved_photo, &saved_document)
                .await;
        }

        let photo_record = match self
            .store
            .create_photo(NewPhoto {
                original_name: photo.original_name.clone(),
                stored_name: saved_photo.stored_name.clone(),
                byte_size: photo.data.len() as i64,
                media_type: photo.media_type.clone(),
                path: saved_photo.path.display().to_string(),
                fingerprint: Some(encoded.clone()),
                biometric: fingerprint.is_biometric(),
            })
            .await
        {
            Ok(record) => record,
            // Lost the race against a concurrent identical upload; the
            // unique index is the authoritative guard.
            Err(StoreError::DuplicateFingerprint) => {
                let original = self
                    .store
                    .photo_by_fingerprint(&encoded)
                    .await?
                    .ok_or_else(|| ApiError::internal("Duplicate photo vanished"))?;
                return self
                    .reject_duplicate(original.id, &saved_photo, &saved_document)
                    .await;
            }
            Err(e) => {
                self.cleanup(&saved_photo, &saved_document).await;
                return Err(e.into());
            }
        };

        let document_record = match self
            .store
            .create_document(NewDocument {
                original_name: document.original_name.clone(),
                stored_name: saved_document.stored_name.clone(),
                byte_size: document.data.len() as i64,
                media_type: document.media_type.clone(),
                path: saved_document.path.display().to_string(),
            })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.cleanup(&saved_photo, &saved_document).await;
                return Err(e.into());
            }
        };

        let mut audit = audit_entry(Utc::now(), "Dossier created, verification started");
        if let Some(note) = &degraded_note {
            audit = append_audit(&audit, &audit_entry(Utc::now(), note));
        }

        let dossier = match self
            .store
            .create_dossier(photo_record.id, document_record.id, requester.id, &audit)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.cleanup(&saved_photo, &saved_document).await;
                return Err(e.into());
            }
        };

        // Evaluator failure degrades to human review instead of
        // failing the request.
        let verdict = match self
            .evaluator
            .evaluate(
                &photo.data,
                &photo.media_type,
                &document.data,
                &document.media_type,
            )
            .await
        {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(dossier_id = %dossier.id, error = %e, "Evaluator unavailable");
                MatchVerdict::degraded(format!("Evaluator unavailable: {e}"))
            }
        };

        let updated = self.apply_verdict(&dossier, &verdict).await?;
        self.notify_requester(requester, &updated).await;

        Ok(UploadOutcome::Processed(updated))
    }

    async fn apply_verdict(
        &self,
        dossier: &DossierRecord,
        verdict: &MatchVerdict,
    ) -> Result<DossierRecord, ApiError> {
        let mut audit = append_audit(
            &dossier.audit_log,
            &audit_entry(
                Utc::now(),
                &format!(
                    "Evaluator verdict: match={} similarity={:.2} confidence={}",
                    verdict.matched, verdict.similarity, verdict.confidence
                ),
            ),
        );
        if verdict.kinship_alert {
            // Recorded for auditors; kinship does not change the decision.
            audit = append_audit(&audit, &audit_entry(Utc::now(), "Kinship alert raised"));
        }

        let transition = match decide(verdict) {
            Decision::Approve => {
                audit = append_audit(&audit, &audit_entry(Utc::now(), "Approved automatically"));
                DossierTransition {
                    status: DossierStatus::Approved,
                    decided_by: DecidedBy::Automated,
                    observation: None,
                    audit_log: audit,
                }
            }
            Decision::Reject => {
                audit = append_audit(&audit, &audit_entry(Utc::now(), "Rejected automatically"));
                DossierTransition {
                    status: DossierStatus::Rejected,
                    decided_by: DecidedBy::Automated,
                    observation: None,
                    audit_log: audit,
                }
            }
            Decision::EscalateToHuman { reason } => {
                audit = append_audit(
                    &audit,
                    &audit_entry(Utc::now(), &format!("Escalated to human review: {reason}")),
                );
                self.ping_review(dossier.id, &reason).await;
                DossierTransition {
                    status: DossierStatus::Pending,
                    decided_by: DecidedBy::Human,
                    observation: Some(reason),
                    audit_log: audit,
                }
            }
        };

        Ok(self.store.apply_transition(dossier.id, transition).await?)
    }

    /// Record a human reviewer's verdict on an existing dossier.
    pub async fn human_decision(
        &self,
        dossier_id: Uuid,
        status: DossierStatus,
        observation: Option<String>,
        reviewer_id: &str,
    ) -> Result<DossierRecord, ApiError> {
        let dossier = self
            .store
            .dossier(dossier_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Dossier not found"))?;

        if dossier.status.is_terminal() && !self.settings.allow_redecision {
            return Err(ApiError::conflict(format!(
                "Dossier already decided ({})",
                dossier.status
            )));
        }

        let audit = append_audit(
            &dossier.audit_log,
            &audit_entry(
                Utc::now(),
                &format!("Status set to {status} by reviewer {reviewer_id}"),
            ),
        );
        let updated = self
            .store
            .apply_transition(
                dossier_id,
                DossierTransition {
                    status,
                    decided_by: DecidedBy::Human,
                    observation,
                    audit_log: audit,
                },
            )
            .await?;

        if let Some(requester) = self.store.requester(updated.requester_id).await? {
            self.notify_requester(&requester, &updated).await;
        }

        Ok(updated)
    }

    async fn reject_duplicate(
        &self,
        original_photo_id: Uuid,
        photo: &SavedArtifact,
        document: &SavedArtifact,
    ) -> Result<UploadOutcome, ApiError> {
        tracing::info!(%original_photo_id, "Duplicate fingerprint, rejecting upload");
        self.cleanup(photo, document).await;
        Ok(UploadOutcome::Duplicate { original_photo_id })
    }

    async fn cleanup(&self, photo: &SavedArtifact, document: &SavedArtifact) {
        self.artifacts.remove(&photo.path).await;
        self.artifacts.remove(&document.path).await;
    }

    /// Deliver the status webhook to the requester's callback, at most
    /// once per transition. Failures are logged and swallowed.
    async fn notify_requester(&self, requester: &RequesterRecord, dossier: &DossierRecord) {
        let Some(url) = &requester.callback_url else {
            return;
        };
        let notification =
            StatusNotification::new(dossier.id, dossier.status.as_str(), dossier.created_at);
        if let Err(e) = self.notifier.notify(url, &notification).await {
            tracing::warn!(dossier_id = %dossier.id, error = %e, "Status webhook delivery failed");
        }
    }

    async fn ping_review(&self, dossier_id: Uuid, reason: &str) {
        let Some(url) = &self.settings.review_webhook_url else {
            return;
        };
        let message = format!(
            "Dossier requires human review: {reason}\n{}/dossier/{dossier_id}",
            self.settings.public_base_url
        );
        if let Err(e) = self.notifier.ping_review(url, &message).await {
            tracing::warn!(%dossier_id, error = %e, "Review webhook delivery failed");
        }
    }
}
