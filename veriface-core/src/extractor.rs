//! Fingerprint extractor contract and the built-in embedding backend.
//!
//! The extractor is a collaborator: given decoded image bytes it
//! produces a fixed-length descriptor or a typed failure. Callers must
//! tolerate failure — the pipeline falls back to a content hash and
//! keeps going.

use std::io::Cursor;
use std::path::PathBuf;

use async_trait::async_trait;
use image::imageops::FilterType;
use image::ImageReader;
use sha3::{Digest, Sha3_256};
use tokio::sync::OnceCell;

use crate::error::ExtractError;
use crate::fingerprint::DESCRIPTOR_LEN;

/// Minimum image edge, in pixels, for a face to be usable.
const MIN_FACE_EDGE: u32 = 64;

/// Capability interface for biometric feature extraction.
#[async_trait]
pub trait FingerprintExtractor: Send + Sync {
    /// Extract a fixed-length facial descriptor from image bytes.
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>, ExtractError>;
}

/// Built-in extractor producing a 128-dim intensity-distribution
/// descriptor from the decoded image.
///
/// This is a lightweight stand-in embedding: it is stable across
/// re-reads of the same bytes and cheap to compute, which is all the
/// dedup layer needs. Deployments with a real face-recognition
/// backend implement [`FingerprintExtractor`] over it instead.
///
/// Initialization is lazy and idempotent: the model directory is
/// checked once behind a [`OnceCell`], and a failed check is retried
/// on the next call rather than latched in a boolean flag.
pub struct EmbeddingExtractor {
    model_dir: PathBuf,
    ready: OnceCell<()>,
}

impl EmbeddingExtractor {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            ready: OnceCell::new(),
        }
    }

    async fn ensure_ready(&self) -> Result<(), ExtractError> {
        self.ready
            .get_or_try_init(|| async {
                let dir = self.model_dir.clone();
                if tokio::fs::metadata(&dir).await.is_err() {
                    return Err(ExtractError::ModelUnavailable(format!(
                        "model directory {} not found",
                        dir.display()
                    )));
                }
                tracing::info!(model_dir = %dir.display(), "embedding extractor initialized");
                Ok(())
            })
            .await
            .copied()
    }

    fn embed(image: &[u8]) -> Result<Vec<f32>, ExtractError> {
        let decoded = ImageReader::new(Cursor::new(image))
            .with_guessed_format()
            .map_err(|e| ExtractError::InvalidImage(e.to_string()))?
            .decode()
            .map_err(|e| ExtractError::InvalidImage(e.to_string()))?;

        if decoded.width() < MIN_FACE_EDGE || decoded.height() < MIN_FACE_EDGE {
            return Err(ExtractError::NoFaceDetected);
        }

        // 16x8 grid of mean intensities, zero-meaned so the descriptor
        // is insensitive to overall exposure
        let gray = decoded.to_luma8();
        let grid = image::imageops::resize(&gray, 16, 8, FilterType::Triangle);
        let mut values: Vec<f32> = grid.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
        debug_assert_eq!(values.len(), DESCRIPTOR_LEN);

        let mean = values.iter().sum::<f32>() / values.len() as f32;
        for v in &mut values {
            *v -= mean;
        }
        Ok(values)
    }
}

#[async_trait]
impl FingerprintExtractor for EmbeddingExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>, ExtractError> {
        self.ensure_ready().await?;
        Self::embed(image)
    }
}

/// Scripted failure modes for [`MockExtractor`].
#[derive(Debug, Clone, Copy)]
pub enum MockFailure {
    NoFaceDetected,
    ModelUnavailable,
}

/// Test extractor: derives a deterministic descriptor from the input
/// bytes, or fails in a scripted way.
///
/// Identical bytes always produce identical descriptors, which makes
/// the dedup path exercisable without a recognition backend.
#[derive(Debug, Default)]
pub struct MockExtractor {
    failure: Option<MockFailure>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failure: MockFailure) -> Self {
        Self {
            failure: Some(failure),
        }
    }
}

#[async_trait]
impl FingerprintExtractor for MockExtractor {
    async fn extract(&self, image: &[u8]) -> Result<Vec<f32>, ExtractError> {
        match self.failure {
            Some(MockFailure::NoFaceDetected) => Err(ExtractError::NoFaceDetected),
            Some(MockFailure::ModelUnavailable) => Err(ExtractError::ModelUnavailable(
                "mock extractor configured to fail".into(),
            )),
            None => {
                let digest = Sha3_256::digest(image);
                let values = (0..DESCRIPTOR_LEN)
                    .map(|i| digest[i % digest.len()] as f32 / 255.0)
                    .collect();
                Ok(values)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;

    fn png_bytes(width: u32, height: u32, shade: u8) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([shade, (x % 256) as u8, (y % 256) as u8])
        });
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_embed_produces_fixed_length_descriptor() {
        let extractor = EmbeddingExtractor::new(std::env::temp_dir());
        let descriptor = extractor.extract(&png_bytes(128, 128, 40)).await.unwrap();
        assert_eq!(descriptor.len(), DESCRIPTOR_LEN);
    }

    #[tokio::test]
    async fn test_embed_is_deterministic() {
        let extractor = EmbeddingExtractor::new(std::env::temp_dir());
        let bytes = png_bytes(128, 128, 90);
        let a = extractor.extract(&bytes).await.unwrap();
        let b = extractor.extract(&bytes).await.unwrap();
        assert_eq!(
            Fingerprint::Descriptor(a).encode(),
            Fingerprint::Descriptor(b).encode()
        );
    }

    #[tokio::test]
    async fn test_tiny_image_rejected_as_no_face() {
        let extractor = EmbeddingExtractor::new(std::env::temp_dir());
        let err = extractor.extract(&png_bytes(32, 32, 10)).await.unwrap_err();
        assert!(matches!(err, ExtractError::NoFaceDetected));
    }

    #[tokio::test]
    async fn test_missing_model_dir_is_unavailable() {
        let extractor = EmbeddingExtractor::new("/definitely/not/a/real/model/dir");
        let err = extractor.extract(&png_bytes(128, 128, 10)).await.unwrap_err();
        assert!(matches!(err, ExtractError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_undecodable_bytes_rejected() {
        let extractor = EmbeddingExtractor::new(std::env::temp_dir());
        let err = extractor.extract(b"not an image at all").await.unwrap_err();
        assert!(matches!(err, ExtractError::InvalidImage(_)));
    }

    #[tokio::test]
    async fn test_mock_extractor_deterministic_per_bytes() {
        let mock = MockExtractor::new();
        let a = mock.extract(b"same").await.unwrap();
        let b = mock.extract(b"same").await.unwrap();
        let c = mock.extract(b"different").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
