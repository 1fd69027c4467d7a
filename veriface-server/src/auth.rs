//! API key authentication module
//!
//! Provides the `Requester` extractor for Axum handlers. Callers
//! authenticate with an `x-api-key` header resolved against the
//! verification store.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::ApiError;
use crate::state::AppState;
use crate::store::RequesterRecord;

const API_KEY_HEADER: &str = "x-api-key";

/// The authenticated caller, resolved once per request.
#[derive(Debug, Clone)]
pub struct Requester(pub RequesterRecord);

impl FromRequestParts<AppState> for Requester {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing x-api-key header"))?;

        let requester = state
            .store
            .requester_by_api_key(key)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Invalid API key"))?;

        Ok(Self(requester))
    }
}
