//! Dossier states, the automated decision policy, and audit logging.
//!
//! A dossier starts PENDING and moves to APPROVED or REJECTED exactly
//! once on the automated path; the human decision transition is the
//! sole path that may touch a non-PENDING dossier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verdict::MatchVerdict;

/// Lifecycle state of a verification dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DossierStatus {
    Pending,
    Approved,
    Rejected,
}

impl DossierStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// APPROVED and REJECTED are terminal for the automated path.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for DossierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who settled (or escalated) the dossier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecidedBy {
    Automated,
    Human,
}

impl DecidedBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Automated => "AUTOMATED",
            Self::Human => "HUMAN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "AUTOMATED" => Some(Self::Automated),
            "HUMAN" => Some(Self::Human),
            _ => None,
        }
    }
}

/// Outcome of applying the decision policy to a verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
    /// Keep the dossier PENDING and hand it to a reviewer.
    EscalateToHuman { reason: String },
}

/// Apply the automated decision policy to an evaluator verdict.
///
/// Escalates when the evaluator asks for review, or when the verdict
/// is false-but-ambiguous: no-match while scoring at or above the
/// evaluator's own recommended threshold. Clear outcomes settle
/// automatically.
///
/// `kinship_alert` deliberately does not influence the decision; the
/// parentage rejection branch is an inactive policy hook and is only
/// surfaced in the audit log by the caller.
pub fn decide(verdict: &MatchVerdict) -> Decision {
    let ambiguous_mismatch =
        !verdict.matched && verdict.similarity >= verdict.recommended_threshold;

    if verdict.requires_human_review || ambiguous_mismatch {
        let reason = if !verdict.reason.is_empty() {
            verdict.reason.clone()
        } else if verdict.requires_human_review {
            "evaluator requested human review".to_string()
        } else {
            format!(
                "no-match at similarity {:.2} >= recommended threshold {:.2}",
                verdict.similarity, verdict.recommended_threshold
            )
        };
        Decision::EscalateToHuman { reason }
    } else if verdict.matched {
        Decision::Approve
    } else {
        Decision::Reject
    }
}

/// Format a single timestamped audit line.
pub fn audit_entry(now: DateTime<Utc>, message: &str) -> String {
    format!("[{}] {}", now.to_rfc3339(), message)
}

/// Append a line to an audit log without touching prior content.
///
/// The log is append-only: this is the only way it ever changes, and
/// the previous log is always a prefix of the result.
pub fn append_audit(existing: &str, line: &str) -> String {
    if existing.is_empty() {
        line.to_string()
    } else {
        format!("{existing}\n{line}")
    }
}
