//! Dossier handlers
//!
//! GET /dossier/{id} for status lookup and POST /dossier/decision for
//! the human review surface.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use veriface_core::DossierStatus;

use crate::auth::Requester;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::DossierRecord;

/// Dossier status view
#[derive(Serialize, ToSchema)]
pub struct DossierResponse {
    #[schema(value_type = String)]
    pub id: Uuid,
    /// PENDING, APPROVED or REJECTED
    #[schema(example = "APPROVED")]
    pub status: String,
    /// AUTOMATED or HUMAN, once a decision pass ran
    pub decided_by: Option<String>,
    #[schema(value_type = String)]
    pub photo_id: Uuid,
    #[schema(value_type = String)]
    pub document_id: Uuid,
    /// Reviewer or escalation observation, when present
    pub observation: Option<String>,
    #[schema(value_type = String)]
    pub created_at: String,
    #[schema(value_type = String)]
    pub updated_at: String,
}

impl From<DossierRecord> for DossierResponse {
    fn from(record: DossierRecord) -> Self {
        Self {
            id: record.id,
            status: record.status.to_string(),
            decided_by: record.decided_by.map(|d| d.as_str().to_string()),
            photo_id: record.photo_id,
            document_id: record.document_id,
            observation: record.observation,
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// Fetch a dossier by id
#[utoipa::path(
    get,
    path = "/dossier/{id}",
    tag = "Dossiers",
    params(
        ("id" = String, Path, description = "Dossier id")
    ),
    responses(
        (status = 200, description = "Dossier found", body = DossierResponse),
        (status = 401, description = "Missing or invalid API key"),
        (status = 404, description = "Dossier not found")
    )
)]
pub async fn get_dossier_handler(
    State(state): State<AppState>,
    Requester(_requester): Requester,
    Path(id): Path<Uuid>,
) -> Result<Json<DossierResponse>, ApiError> {
    let dossier = state
        .store
        .dossier(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Dossier not found"))?;
    Ok(Json(dossier.into()))
}

/// Human reviewer's decision on a dossier
#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionRequest {
    #[schema(value_type = String)]
    pub dossier_id: Uuid,
    /// APPROVED or REJECTED
    #[schema(example = "APPROVED")]
    pub status: String,
    pub observation: Option<String>,
    pub reviewer_id: String,
}

/// Response for a recorded decision
#[derive(Serialize, ToSchema)]
pub struct DecisionResponse {
    #[schema(example = "Decision recorded")]
    pub message: String,
    pub data: DossierResponse,
}

/// Record a human decision
///
/// Transitions the dossier to the given terminal status and notifies
/// the requester's callback. Re-deciding an already-terminal dossier
/// is a conflict when redecision is disabled.
#[utoipa::path(
    post,
    path = "/dossier/decision",
    tag = "Dossiers",
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Decision recorded", body = DecisionResponse),
        (status = 400, description = "Invalid target status"),
        (status = 404, description = "Dossier not found"),
        (status = 409, description = "Dossier already decided")
    )
)]
pub async fn decision_handler(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, ApiError> {
    let status = DossierStatus::parse(&request.status)
        .filter(|s| s.is_terminal())
        .ok_or_else(|| {
            ApiError::bad_request("Decision status must be APPROVED or REJECTED")
        })?;

    let updated = state
        .pipeline
        .human_decision(
            request.dossier_id,
            status,
            request.observation,
            &request.reviewer_id,
        )
        .await?;

    Ok(Json(DecisionResponse {
        message: "Decision recorded".to_string(),
        data: updated.into(),
    }))
}
