use thiserror::Error;

/// Errors from fingerprint encoding, decoding and comparison.
#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Invalid fingerprint encoding: {0}")]
    InvalidEncoding(String),

    #[error("Descriptor length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Errors from the fingerprint extractor collaborator.
///
/// The pipeline never aborts on these: every variant is absorbed by
/// the content-hash fallback (degrade-not-fail).
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("No face detected in image")]
    NoFaceDetected,

    #[error("Recognition model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Image could not be decoded: {0}")]
    InvalidImage(String),
}

/// Errors from the match evaluator collaborator.
///
/// Any of these collapses into the degraded verdict
/// ([`crate::MatchVerdict::degraded`]) in the decision pipeline.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    #[error("Evaluator credentials missing: {0}")]
    MissingCredentials(String),

    #[error("Evaluator request timed out after {0}s")]
    Timeout(u64),

    #[error("Evaluator HTTP error: {0}")]
    Http(String),

    #[error("Evaluator returned an invalid response: {0}")]
    InvalidResponse(String),
}
