//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 specification for the verification API.

use utoipa::OpenApi;

use crate::handlers::{
    DecisionRequest, DecisionResponse, DossierResponse, HealthResponse, UploadData, UploadResponse,
};

/// VeriFace verification API - OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "VeriFace - Identity Verification API",
        version = "0.1.0",
        description = r#"
## Selfie vs. identity-document verification

VeriFace ingests a selfie and an identity document, fingerprints the
selfie for duplicate detection, asks a vision model whether both files
depict the same person, and drives a PENDING → APPROVED/REJECTED
dossier through automated or human-reviewed resolution.

### Flow

1. `POST /upload` with both files (authenticated with `x-api-key`)
2. Exact-duplicate selfies are rejected up front, without a dossier
3. Clear verdicts settle automatically; ambiguous ones stay PENDING
   for a human reviewer (`POST /dossier/decision`)
4. Every settlement fires a webhook to the requester's callback URL

### Migrating from the v0 API

Response fields are snake_case. Clients of the previous camelCase API
map `originalImageId` → `original_image_id`, `imageId` → `photo_id`,
and `processedObs` → `observation`.
"#,
        license(
            name = "MIT OR Apache-2.0",
            url = "https://github.com/veriface/veriface/blob/main/LICENSE"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Verification", description = "Upload a selfie and document for verification"),
        (name = "Dossiers", description = "Dossier lookup and the human review surface"),
        (name = "Files", description = "Stored photo and document retrieval"),
        (name = "Health", description = "Service health endpoint")
    ),
    paths(
        crate::handlers::upload::upload_handler,
        crate::handlers::dossier::get_dossier_handler,
        crate::handlers::dossier::decision_handler,
        crate::handlers::files::view_photo_handler,
        crate::handlers::files::view_document_handler,
        crate::handlers::health::health,
    ),
    components(schemas(
        UploadResponse,
        UploadData,
        DossierResponse,
        DecisionRequest,
        DecisionResponse,
        HealthResponse,
    ))
)]
pub struct ApiDoc;
