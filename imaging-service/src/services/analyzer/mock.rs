//! Deterministic analyzer for development and tests.

use super::{Analyzer, AnalyzerError};
use crate::models::AnalysisReport;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Derives a stable report from the file's size and SHA-256 digest without
/// running any model.
#[derive(Debug, Default)]
pub struct MockAnalyzer;

impl MockAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(
        &self,
        path: &Path,
        content_type: &str,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AnalyzerError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?;

        if data.is_empty() {
            return Err(AnalyzerError::InvalidInput("Image is empty".to_string()));
        }

        let digest = Sha256::digest(&data);
        let fingerprint = hex::encode(&digest[..8]);
        // First digest byte spreads confidence over [0.50, 0.99].
        let confidence = 0.5 + f32::from(digest[0]) / 255.0 * 0.49;

        Ok(AnalysisReport {
            findings: format!(
                "Mock analysis of {} bytes ({}), fingerprint {}. No acute abnormality detected.",
                data.len(),
                content_type,
                fingerprint
            ),
            diagnosis: "No significant findings".to_string(),
            recommendations: "Routine follow-up.".to_string(),
            confidence: (confidence * 100.0).round() / 100.0,
            model: self.name().to_string(),
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_report_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("xray.png");
        tokio::fs::write(&path, b"\x89PNG fake image payload").await.unwrap();

        let analyzer = MockAnalyzer::new();
        let first = analyzer.analyze(&path, "image/png").await.unwrap();
        let second = analyzer.analyze(&path, "image/png").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.model, "mock");
        assert!(first.findings.contains("image/png"));
        assert!((0.5..=0.99).contains(&first.confidence));
    }

    #[tokio::test]
    async fn test_missing_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = MockAnalyzer::new();

        let result = analyzer
            .analyze(&dir.path().join("nope.png"), "image/png")
            .await;
        assert!(matches!(result, Err(AnalyzerError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_empty_file_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.png");
        tokio::fs::write(&path, b"").await.unwrap();

        let result = MockAnalyzer::new().analyze(&path, "image/png").await;
        assert!(matches!(result, Err(AnalyzerError::InvalidInput(_))));
    }
}
