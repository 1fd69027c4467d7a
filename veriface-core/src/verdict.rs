//! Structured verdict from the photo/document match evaluator.

use serde::{Deserialize, Serialize};

/// Outcome of comparing a selfie photo against an identity document.
///
/// Produced per evaluation and never persisted as its own entity; its
/// conclusions are folded into the dossier status and audit log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchVerdict {
    /// Whether the photo and document depict the same person.
    #[serde(rename = "match")]
    pub matched: bool,
    /// Similarity score in [0, 1].
    pub similarity: f64,
    /// Confidence label (e.g. "high", "low", "degraded").
    pub confidence: String,
    /// Threshold the evaluator recommends for `similarity`, in [0, 1].
    pub recommended_threshold: f64,
    /// Possible close-relative lookalike (inactive policy hook).
    #[serde(default)]
    pub kinship_alert: bool,
    /// The evaluator wants a human to decide.
    #[serde(default)]
    pub requires_human_review: bool,
    /// Free-text rationale.
    #[serde(default)]
    pub reason: String,
}

impl MatchVerdict {
    /// Synthetic verdict used whenever the evaluator call fails.
    ///
    /// Forces the human-review path so a dossier is never left without
    /// a decision attempt.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            similarity: 0.0,
            confidence: "degraded".to_string(),
            recommended_threshold: 0.0,
            kinship_alert: false,
            requires_human_review: true,
            reason: reason.into(),
        }
    }

    /// Validate value ranges after deserialization.
    ///
    /// A parsed-but-out-of-range verdict is as untrustworthy as a
    /// schema mismatch; callers treat a validation failure as an
    /// evaluator failure and degrade.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity) {
            return Err(format!("similarity {} out of range", self.similarity));
        }
        if !(0.0..=1.0).contains(&self.recommended_threshold) {
            return Err(format!(
                "recommended_threshold {} out of range",
                self.recommended_threshold
            ));
        }
        if self.confidence.is_empty() {
            return Err("confidence label is empty".to_string());
        }
        Ok(())
    }
}
