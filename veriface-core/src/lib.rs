//! Veriface Core - identity verification domain library
//!
//! This crate provides the domain primitives for the Veriface dossier
//! pipeline: biometric fingerprints with a content-hash fallback, the
//! fingerprint extractor contract, the photo/document match verdict and
//! its evaluator contract, and the dossier decision policy with its
//! append-only audit log.
//!
//! # Example
//!
//! ```no_run
//! use veriface_core::{decide, Decision, MatchVerdict};
//!
//! let verdict = MatchVerdict::degraded("evaluation error");
//! assert!(matches!(decide(&verdict), Decision::EscalateToHuman { .. }));
//! ```

pub mod dossier;
pub mod error;
pub mod evaluator;
pub mod extractor;
pub mod fingerprint;
pub mod verdict;

// Re-export main types for convenience
pub use dossier::{append_audit, audit_entry, decide, DecidedBy, Decision, DossierStatus};
pub use error::{EvaluatorError, ExtractError, FingerprintError};
pub use evaluator::{DisabledEvaluator, GeminiEvaluator, MatchEvaluator, MockEvaluator};
pub use extractor::{EmbeddingExtractor, FingerprintExtractor, MockExtractor, MockFailure};
pub use fingerprint::{compare, Fingerprint, MatchScore, DESCRIPTOR_LEN};
pub use verdict::MatchVerdict;
