//! Match evaluator contract and the Gemini-backed implementation.
//!
//! The evaluator is consulted exactly once per upload, only after the
//! dedup index found no duplicate. There is no retry layer: a failed
//! call is absorbed by the caller through [`MatchVerdict::degraded`].

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;

use crate::error::EvaluatorError;
use crate::verdict::MatchVerdict;

/// Default Gemini model used for face comparison.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Instructions sent alongside the two images.
const COMPARISON_PROMPT: &str = "\
You are a forensic face-comparison system. You receive two images: \
first a selfie photo, then an identity document containing a portrait. \
Decide whether both depict the same person. Account for ageing, \
lighting, pose and print quality. Flag close relatives who merely look \
alike via kinship_alert. When the evidence is genuinely ambiguous, set \
requires_human_review instead of guessing. Respond with JSON only, \
matching the provided schema: match (boolean), similarity (0..1), \
confidence (string label), recommended_threshold (0..1), kinship_alert \
(boolean), requires_human_review (boolean), reason (string).";

/// Capability interface for the photo/document comparison service.
#[async_trait]
pub trait MatchEvaluator: Send + Sync {
    /// Compare a selfie photo against an identity document.
    async fn evaluate(
        &self,
        photo: &[u8],
        photo_mime: &str,
        document: &[u8],
        document_mime: &str,
    ) -> Result<MatchVerdict, EvaluatorError>;
}

/// Gemini-backed evaluator: a single blocking `generateContent` call
/// per upload with a bounded timeout and a strict response schema.
pub struct GeminiEvaluator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl GeminiEvaluator {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Result<Self, EvaluatorError> {
        Self::with_model(api_key, DEFAULT_GEMINI_MODEL, timeout_secs)
    }

    pub fn with_model(
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, EvaluatorError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(EvaluatorError::MissingCredentials(
                "empty Gemini API key".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EvaluatorError::Http(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            timeout_secs,
        })
    }

    /// Parse the model output, stripping markdown code fences if the
    /// model wrapped its JSON despite the response mime type.
    fn parse_verdict(text: &str) -> Result<MatchVerdict, EvaluatorError> {
        let trimmed = text.trim();
        let json_str = if trimmed.starts_with("```") {
            let without_opening = trimmed
                .strip_prefix("```json")
                .or_else(|| trimmed.strip_prefix("```"))
                .unwrap_or(trimmed);
            without_opening
                .strip_suffix("```")
                .unwrap_or(without_opening)
                .trim()
        } else {
            trimmed
        };

        let verdict: MatchVerdict = serde_json::from_str(json_str)
            .map_err(|e| EvaluatorError::InvalidResponse(format!("bad verdict JSON: {e}")))?;
        verdict
            .validate()
            .map_err(EvaluatorError::InvalidResponse)?;
        Ok(verdict)
    }

    fn response_schema() -> serde_json::Value {
        json!({
            "type": "OBJECT",
            "properties": {
                "match": { "type": "BOOLEAN" },
                "similarity": { "type": "NUMBER" },
                "confidence": { "type": "STRING" },
                "recommended_threshold": { "type": "NUMBER" },
                "kinship_alert": { "type": "BOOLEAN" },
                "requires_human_review": { "type": "BOOLEAN" },
                "reason": { "type": "STRING" }
            },
            "required": [
                "match", "similarity", "confidence", "recommended_threshold",
                "kinship_alert", "requires_human_review", "reason"
            ]
        })
    }
}

#[async_trait]
impl MatchEvaluator for GeminiEvaluator {
    async fn evaluate(
        &self,
        photo: &[u8],
        photo_mime: &str,
        document: &[u8],
        document_mime: &str,
    ) -> Result<MatchVerdict, EvaluatorError> {
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": COMPARISON_PROMPT },
                    { "inline_data": { "mime_type": photo_mime, "data": BASE64.encode(photo) } },
                    { "inline_data": { "mime_type": document_mime, "data": BASE64.encode(document) } }
                ]
            }],
            "generationConfig": {
                "response_mime_type": "application/json",
                "response_schema": Self::response_schema()
            }
        });

        let url = format!(
            "{GEMINI_ENDPOINT}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        tracing::debug!(model = %self.model, "sending face-comparison request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EvaluatorError::Timeout(self.timeout_secs)
                } else {
                    EvaluatorError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EvaluatorError::Http(format!(
                "status {status}: {detail}"
            )));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EvaluatorError::InvalidResponse(e.to_string()))?;

        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| {
                EvaluatorError::InvalidResponse("no text candidate in response".into())
            })?;

        Self::parse_verdict(text)
    }
}

/// Evaluator used when no credentials are configured. Every call
/// fails, which routes every dossier into human review.
pub struct DisabledEvaluator;

#[async_trait]
impl MatchEvaluator for DisabledEvaluator {
    async fn evaluate(
        &self,
        _photo: &[u8],
        _photo_mime: &str,
        _document: &[u8],
        _document_mime: &str,
    ) -> Result<MatchVerdict, EvaluatorError> {
        Err(EvaluatorError::MissingCredentials(
            "no evaluator credentials configured".into(),
        ))
    }
}

/// Fixed behavior for [`MockEvaluator`].
#[derive(Debug, Clone)]
enum MockBehavior {
    Verdict(MatchVerdict),
    Timeout,
}

/// Test evaluator with a scripted outcome.
#[derive(Debug, Clone)]
pub struct MockEvaluator {
    behavior: MockBehavior,
}

impl MockEvaluator {
    /// Always returns the given verdict.
    pub fn returning(verdict: MatchVerdict) -> Self {
        Self {
            behavior: MockBehavior::Verdict(verdict),
        }
    }

    /// Confident same-person verdict.
    pub fn approving() -> Self {
        Self::returning(MatchVerdict {
            matched: true,
            similarity: 0.95,
            confidence: "high".into(),
            recommended_threshold: 0.8,
            kinship_alert: false,
            requires_human_review: false,
            reason: "same person".into(),
        })
    }

    /// Confident different-person verdict.
    pub fn rejecting() -> Self {
        Self::returning(MatchVerdict {
            matched: false,
            similarity: 0.2,
            confidence: "high".into(),
            recommended_threshold: 0.8,
            kinship_alert: false,
            requires_human_review: false,
            reason: "different person".into(),
        })
    }

    /// Verdict that demands human review.
    pub fn escalating() -> Self {
        Self::returning(MatchVerdict {
            matched: false,
            similarity: 0.6,
            confidence: "low".into(),
            recommended_threshold: 0.8,
            kinship_alert: false,
            requires_human_review: true,
            reason: "occluded face".into(),
        })
    }

    /// Always fails with a timeout.
    pub fn failing() -> Self {
        Self {
            behavior: MockBehavior::Timeout,
        }
    }
}

#[async_trait]
impl MatchEvaluator for MockEvaluator {
    async fn evaluate(
        &self,
        _photo: &[u8],
        _photo_mime: &str,
        _document: &[u8],
        _document_mime: &str,
    ) -> Result<MatchVerdict, EvaluatorError> {
        match &self.behavior {
            MockBehavior::Verdict(v) => Ok(v.clone()),
            MockBehavior::Timeout => Err(EvaluatorError::Timeout(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json_verdict() {
        let text = r#"{"match": true, "similarity": 0.9, "confidence": "high",
            "recommended_threshold": 0.8, "kinship_alert": false,
            "requires_human_review": false, "reason": "ok"}"#;
        let v = GeminiEvaluator::parse_verdict(text).unwrap();
        assert!(v.matched);
    }

    #[test]
    fn test_parse_fenced_json_verdict() {
        let text = "```json\n{\"match\": false, \"similarity\": 0.3, \"confidence\": \"low\", \"recommended_threshold\": 0.8}\n```";
        let v = GeminiEvaluator::parse_verdict(text).unwrap();
        assert!(!v.matched);
        assert_eq!(v.similarity, 0.3);
    }

    #[test]
    fn test_parse_rejects_schema_mismatch() {
        assert!(GeminiEvaluator::parse_verdict("{\"verdict\": \"yes\"}").is_err());
        assert!(GeminiEvaluator::parse_verdict("not json").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_values() {
        let text = r#"{"match": true, "similarity": 7.0, "confidence": "high", "recommended_threshold": 0.8}"#;
        assert!(matches!(
            GeminiEvaluator::parse_verdict(text),
            Err(EvaluatorError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_empty_api_key_is_missing_credentials() {
        assert!(matches!(
            GeminiEvaluator::new("", 10),
            Err(EvaluatorError::MissingCredentials(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_evaluator_scripts() {
        let approve = MockEvaluator::approving();
        let v = approve.evaluate(b"p", "image/png", b"d", "image/png").await.unwrap();
        assert!(v.matched && !v.requires_human_review);

        let fail = MockEvaluator::failing();
        assert!(fail.evaluate(b"p", "image/png", b"d", "image/png").await.is_err());
    }
}
