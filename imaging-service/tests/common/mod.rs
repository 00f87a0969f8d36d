#![allow(dead_code)]

use imaging_service::config::{
    AnalyzerBackend, AnalyzerConfig, DatabaseConfig, ImagingConfig, StorageConfig,
};
use axum::body::Body;
use axum::http::{Request, Response};
use imaging_service::services::{Analyzer, Database, LocalStorage};
use imaging_service::startup::{build_router, AppState, Application};
use reqwest::multipart;
use service_core::config::Config as CoreConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tempfile::TempDir;

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR fake chest x-ray payload";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db: Database,
    pub upload_dir: PathBuf,
    pub client: reqwest::Client,
    // Keeps the upload directory and database file alive for the test.
    _dir: TempDir,
}

pub fn mock_analyzer() -> AnalyzerConfig {
    AnalyzerConfig {
        backend: AnalyzerBackend::Mock,
        url: None,
        api_key: None,
        timeout_secs: 5,
    }
}

pub fn remote_analyzer(url: &str) -> AnalyzerConfig {
    AnalyzerConfig {
        backend: AnalyzerBackend::Remote,
        url: Some(url.to_string()),
        api_key: None,
        timeout_secs: 5,
    }
}

pub fn test_config(dir: &Path, analyzer: AnalyzerConfig) -> ImagingConfig {
    ImagingConfig {
        common: CoreConfig {
            port: 0, // Random port for testing
            ..CoreConfig::default()
        },
        database: DatabaseConfig {
            url: format!("sqlite://{}", dir.join("imaging.db").display()),
            max_connections: 2,
        },
        storage: StorageConfig {
            upload_dir: dir.join("uploads").display().to_string(),
            max_upload_bytes: 5 * 1024 * 1024,
        },
        analyzer,
        otlp_endpoint: None,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_analyzer(mock_analyzer()).await
    }

    pub async fn spawn_with_analyzer(analyzer: AnalyzerConfig) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config = test_config(dir.path(), analyzer);
        let upload_dir = PathBuf::from(&config.storage.upload_dir);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let db = app.db().clone();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            db,
            upload_dir,
            client,
            _dir: dir,
        }
    }

    pub async fn upload(&self, form: multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}/upload-image/", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn upload_png(&self, filename: &str) -> serde_json::Value {
        let response = self.upload(image_form(filename, "image/png", PNG_BYTES)).await;
        assert_eq!(response.status().as_u16(), 200);
        response.json().await.expect("Failed to parse JSON")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub fn stored_files(&self) -> Vec<String> {
        std::fs::read_dir(&self.upload_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

pub fn image_form(filename: &str, mime: &str, bytes: &[u8]) -> multipart::Form {
    multipart::Form::new().part(
        "file",
        multipart::Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str(mime)
            .expect("Invalid mime type"),
    )
}

/// State for driving the router in-process with a hand-picked analyzer.
pub async fn test_state(
    dir: &Path,
    analyzer: Arc<dyn Analyzer>,
    max_upload_bytes: usize,
) -> AppState {
    let mut config = test_config(dir, mock_analyzer());
    config.storage.max_upload_bytes = max_upload_bytes;

    let db = Database::connect(&config.database.url, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations().await.expect("Failed to run migrations");
    let storage = LocalStorage::new(&config.storage.upload_dir)
        .await
        .expect("Failed to create upload directory");

    AppState {
        config,
        db,
        storage: Arc::new(storage),
        analyzer,
    }
}

pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    build_router(state.clone())
        .oneshot(request)
        .await
        .expect("Router failed to respond")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}

/// Hand-built `multipart/form-data` body carrying a single `file` part.
pub fn multipart_request(filename: &str, mime: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "imaging-test-boundary";
    let mut body = format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: {mime}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend(format!("\r\n--{boundary}--\r\n").into_bytes());

    Request::builder()
        .method("POST")
        .uri("/upload-image/")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("Failed to build request")
}
