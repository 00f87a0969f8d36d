//! HTTP analyzer backend.
//!
//! Sends the image inline (base64) to an external inference endpoint and
//! reads an analysis report back.

use super::{Analyzer, AnalyzerError};
use crate::models::AnalysisReport;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Remote analyzer configuration.
#[derive(Debug, Clone)]
pub struct RemoteAnalyzerConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

pub struct RemoteAnalyzer {
    config: RemoteAnalyzerConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    /// Name of the stored file, i.e. the storage key `{image_id}-{filename}`.
    filename: &'a str,
    content_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    findings: String,
    #[serde(default)]
    diagnosis: String,
    #[serde(default)]
    recommendations: String,
    confidence: f32,
    model: Option<String>,
}

impl RemoteAnalyzer {
    pub fn new(config: RemoteAnalyzerConfig) -> Result<Self, AnalyzerError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AnalyzerError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl Analyzer for RemoteAnalyzer {
    async fn analyze(
        &self,
        path: &Path,
        content_type: &str,
    ) -> Result<AnalysisReport, AnalyzerError> {
        let data = tokio::fs::read(path).await.map_err(|e| {
            AnalyzerError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })?;

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image");

        let request = AnalyzeRequest {
            filename,
            content_type,
            data: STANDARD.encode(&data),
        };

        tracing::debug!(
            endpoint = %self.config.endpoint,
            bytes = data.len(),
            "Sending image to remote analyzer"
        );

        let mut builder = self.client.post(&self.config.endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AnalyzerError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AnalyzerError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AnalyzerError::ApiError(format!(
                "Analyzer returned {}: {}",
                status, error_text
            )));
        }

        let body: AnalyzeResponse = response
            .json()
            .await
            .map_err(|e| AnalyzerError::ApiError(format!("Failed to parse response: {}", e)))?;

        Ok(AnalysisReport {
            findings: body.findings,
            diagnosis: body.diagnosis,
            recommendations: body.recommendations,
            confidence: body.confidence.clamp(0.0, 1.0),
            model: body.model.unwrap_or_else(|| self.name().to_string()),
        })
    }

    fn name(&self) -> &str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/analyze", addr)
    }

    fn analyzer(endpoint: String, api_key: Option<&str>) -> RemoteAnalyzer {
        RemoteAnalyzer::new(RemoteAnalyzerConfig {
            endpoint,
            api_key: api_key.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn write_image(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("abc-chest.png");
        tokio::fs::write(&path, b"pixels").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_successful_analysis() {
        let router = Router::new().route(
            "/analyze",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer secret");
                assert_eq!(body["filename"], "abc-chest.png");
                assert_eq!(body["content_type"], "image/png");
                assert_eq!(body["data"], STANDARD.encode(b"pixels"));
                Json(json!({
                    "findings": "Mild cardiomegaly.",
                    "diagnosis": "Cardiomegaly",
                    "recommendations": "Echocardiogram.",
                    "confidence": 1.7,
                    "model": "chexnet-v2"
                }))
            }),
        );
        let endpoint = spawn_stub(router).await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir).await;

        let report = analyzer(endpoint, Some("secret"))
            .analyze(&path, "image/png")
            .await
            .unwrap();

        assert_eq!(report.diagnosis, "Cardiomegaly");
        assert_eq!(report.model, "chexnet-v2");
        assert_eq!(report.confidence, 1.0);
    }

    #[tokio::test]
    async fn test_missing_model_defaults_to_backend_name() {
        let router = Router::new().route(
            "/analyze",
            post(|| async { Json(json!({ "findings": "Clear.", "confidence": 0.8 })) }),
        );
        let endpoint = spawn_stub(router).await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir).await;

        let report = analyzer(endpoint, None)
            .analyze(&path, "image/png")
            .await
            .unwrap();

        assert_eq!(report.model, "remote");
        assert_eq!(report.diagnosis, "");
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let router = Router::new().route(
            "/analyze",
            post(|| async { axum::http::StatusCode::TOO_MANY_REQUESTS }),
        );
        let endpoint = spawn_stub(router).await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir).await;

        let result = analyzer(endpoint, None).analyze(&path, "image/png").await;
        assert!(matches!(result, Err(AnalyzerError::RateLimited)));
    }

    #[tokio::test]
    async fn test_server_error_is_api_error() {
        let router = Router::new().route(
            "/analyze",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "model crashed") }),
        );
        let endpoint = spawn_stub(router).await;
        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir).await;

        match analyzer(endpoint, None).analyze(&path, "image/png").await {
            Err(AnalyzerError::ApiError(msg)) => assert!(msg.contains("model crashed")),
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = tempfile::tempdir().unwrap();
        let path = write_image(&dir).await;

        let result = analyzer(format!("http://{}/analyze", addr), None)
            .analyze(&path, "image/png")
            .await;
        assert!(matches!(result, Err(AnalyzerError::NetworkError(_))));
    }
}
