//! Image analysis backends.
//!
//! The upload handler only sees the [`Analyzer`] trait; the concrete backend
//! is chosen from configuration at start-up.

pub mod mock;
pub mod remote;

pub use mock::MockAnalyzer;
pub use remote::{RemoteAnalyzer, RemoteAnalyzerConfig};

use crate::config::{AnalyzerBackend, AnalyzerConfig};
use crate::models::AnalysisReport;
use async_trait::async_trait;
use service_core::error::AppError;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Error type for analyzer operations.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Analyzer not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl From<AnalyzerError> for AppError {
    fn from(err: AnalyzerError) -> Self {
        match err {
            AnalyzerError::InvalidInput(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            AnalyzerError::NotConfigured(msg) => AppError::ConfigError(anyhow::anyhow!(msg)),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}

/// Runs AI analysis over a stored image.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze the file at `path`.
    async fn analyze(&self, path: &Path, content_type: &str)
        -> Result<AnalysisReport, AnalyzerError>;

    /// Backend name, used in logs and metrics labels.
    fn name(&self) -> &str;
}

/// Build the analyzer selected by `config`.
pub fn from_config(config: &AnalyzerConfig) -> Result<Arc<dyn Analyzer>, AnalyzerError> {
    match config.backend {
        AnalyzerBackend::Mock => Ok(Arc::new(MockAnalyzer::new())),
        AnalyzerBackend::Remote => {
            let endpoint = config.url.clone().ok_or_else(|| {
                AnalyzerError::NotConfigured("remote analyzer requires a URL".to_string())
            })?;
            let analyzer = RemoteAnalyzer::new(RemoteAnalyzerConfig {
                endpoint,
                api_key: config.api_key.clone(),
                timeout: Duration::from_secs(config.timeout_secs),
            })?;
            Ok(Arc::new(analyzer))
        }
    }
}
