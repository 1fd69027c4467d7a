//! Biometric fingerprints and their canonical encoding.
//!
//! A fingerprint is either a fixed-length facial descriptor (128 f32
//! values) or a SHA3-256 content hash of the raw photo bytes, used as
//! a pseudo-fingerprint when the recognition backend is unavailable.
//!
//! The canonical string encoding is what the dedup index stores and
//! compares: descriptors as base64 of their little-endian f32 bytes,
//! content hashes as 64 lowercase hex characters. The two shapes never
//! collide (base64 of 512 bytes is far longer than 64 chars and
//! contains non-hex characters in practice, and decoding checks both).

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::error::FingerprintError;

/// Fixed descriptor length produced by the extractor contract.
pub const DESCRIPTOR_LEN: usize = 128;

/// Default distance threshold for descriptor comparison: two
/// descriptors closer than this are considered the same person.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// A biometric fingerprint for equality and similarity checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fingerprint {
    /// Facial descriptor from the recognition backend.
    Descriptor(Vec<f32>),
    /// SHA3-256 of the raw image bytes (non-biometric fallback).
    ContentHash([u8; 32]),
}

/// Result of an explicit fingerprint-vs-fingerprint comparison.
///
/// This is a separate operation from dedup: the upload path only ever
/// uses exact equality on the encoded form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MatchScore {
    pub matched: bool,
    /// Euclidean distance (0 for identical, 1 for a failed exact match).
    pub distance: f32,
    /// `max(0, 1 - distance)`.
    pub similarity: f32,
}

impl Fingerprint {
    /// Build the fallback pseudo-fingerprint from raw image bytes.
    pub fn content_hash(bytes: &[u8]) -> Self {
        let digest = Sha3_256::digest(bytes);
        Self::ContentHash(digest.into())
    }

    /// Whether this fingerprint came from the recognition backend.
    ///
    /// Non-biometric fingerprints are treated conservatively by dedup:
    /// exact-byte duplicates only, never perceptual similarity.
    pub fn is_biometric(&self) -> bool {
        matches!(self, Self::Descriptor(_))
    }

    /// Canonical string encoding used by the dedup index.
    pub fn encode(&self) -> String {
        match self {
            Self::Descriptor(values) => {
                let mut bytes = Vec::with_capacity(values.len() * 4);
                for v in values {
                    bytes.extend_from_slice(&v.to_le_bytes());
                }
                BASE64.encode(bytes)
            }
            Self::ContentHash(digest) => hex::encode(digest),
        }
    }

    /// Decode a canonical fingerprint string.
    pub fn decode(encoded: &str) -> Result<Self, FingerprintError> {
        // 64 hex chars is the content-hash shape
        if encoded.len() == 64 && encoded.bytes().all(|b| b.is_ascii_hexdigit()) {
            let bytes = hex::decode(encoded)
                .map_err(|e| FingerprintError::InvalidEncoding(e.to_string()))?;
            let digest: [u8; 32] = bytes
                .try_into()
                .map_err(|_| FingerprintError::InvalidEncoding("bad digest length".into()))?;
            return Ok(Self::ContentHash(digest));
        }

        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| FingerprintError::InvalidEncoding(e.to_string()))?;
        if bytes.len() % 4 != 0 {
            return Err(FingerprintError::InvalidEncoding(format!(
                "descriptor byte length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let values: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        if values.len() != DESCRIPTOR_LEN {
            return Err(FingerprintError::LengthMismatch {
                expected: DESCRIPTOR_LEN,
                actual: values.len(),
            });
        }
        Ok(Self::Descriptor(values))
    }
}

/// Compare two fingerprints for similarity.
///
/// Descriptor pairs use euclidean distance against `threshold`;
/// content-hash pairs and mixed pairs fall back to exact equality of
/// the canonical encoding (distance 0 or 1).
pub fn compare(a: &Fingerprint, b: &Fingerprint, threshold: f32) -> MatchScore {
    match (a, b) {
        (Fingerprint::Descriptor(da), Fingerprint::Descriptor(db)) => {
            let distance = euclidean_distance(da, db);
            MatchScore {
                matched: distance < threshold,
                distance,
                similarity: (1.0 - distance).max(0.0),
            }
        }
        _ => {
            let matched = a.encode() == b.encode();
            MatchScore {
                matched,
                distance: if matched { 0.0 } else { 1.0 },
                similarity: if matched { 1.0 } else { 0.0 },
            }
        }
    }
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    // Mismatched lengths cannot belong to the same person
    if a.len() != b.len() {
        return 1.0;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(seed: f32) -> Vec<f32> {
        (0..DESCRIPTOR_LEN).map(|i| seed + i as f32 * 0.001).collect()
    }

    #[test]
    fn test_descriptor_encode_decode() {
        let fp = Fingerprint::Descriptor(descriptor(0.25));
        let decoded = Fingerprint::decode(&fp.encode()).unwrap();
        assert_eq!(fp, decoded);
        assert!(fp.is_biometric());
    }

    #[test]
    fn test_content_hash_encode_decode() {
        let fp = Fingerprint::content_hash(b"some image bytes");
        let encoded = fp.encode();
        assert_eq!(encoded.len(), 64);
        let decoded = Fingerprint::decode(&encoded).unwrap();
        assert_eq!(fp, decoded);
        assert!(!fp.is_biometric());
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let a = Fingerprint::content_hash(b"same bytes");
        let b = Fingerprint::content_hash(b"same bytes");
        let c = Fingerprint::content_hash(b"other bytes");
        assert_eq!(a.encode(), b.encode());
        assert_ne!(a.encode(), c.encode());
    }

    #[test]
    fn test_decode_rejects_wrong_descriptor_length() {
        let short = Fingerprint::Descriptor(vec![0.5; 16]).encode();
        assert!(matches!(
            Fingerprint::decode(&short),
            Err(FingerprintError::LengthMismatch { expected: 128, actual: 16 })
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(Fingerprint::decode("not a fingerprint!!!").is_err());
    }

    #[test]
    fn test_compare_identical_descriptors() {
        let fp = Fingerprint::Descriptor(descriptor(0.1));
        let score = compare(&fp, &fp.clone(), DEFAULT_MATCH_THRESHOLD);
        assert!(score.matched);
        assert_eq!(score.distance, 0.0);
        assert_eq!(score.similarity, 1.0);
    }

    #[test]
    fn test_compare_distant_descriptors() {
        let a = Fingerprint::Descriptor(descriptor(0.0));
        let b = Fingerprint::Descriptor(descriptor(0.9));
        let score = compare(&a, &b, DEFAULT_MATCH_THRESHOLD);
        assert!(!score.matched);
        assert!(score.distance > DEFAULT_MATCH_THRESHOLD);
    }

    #[test]
    fn test_compare_content_hashes_exact_only() {
        let a = Fingerprint::content_hash(b"photo-a");
        let b = Fingerprint::content_hash(b"photo-a");
        let c = Fingerprint::content_hash(b"photo-b");
        assert!(compare(&a, &b, DEFAULT_MATCH_THRESHOLD).matched);
        assert!(!compare(&a, &c, DEFAULT_MATCH_THRESHOLD).matched);
    }

    #[test]
    fn test_compare_mixed_kinds_never_match() {
        let a = Fingerprint::Descriptor(descriptor(0.0));
        let b = Fingerprint::content_hash(b"photo");
        let score = compare(&a, &b, DEFAULT_MATCH_THRESHOLD);
        assert!(!score.matched);
        assert_eq!(score.similarity, 0.0);
    }
}
