use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

const DEFAULT_MAX_UPLOAD_MB: usize = 20;
const DEFAULT_ANALYZER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct ImagingConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub analyzer: AnalyzerConfig,
    pub otlp_endpoint: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub upload_dir: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    pub backend: AnalyzerBackend,
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerBackend {
    Mock,
    Remote,
}

impl ImagingConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;

        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let max_upload_mb: usize = parse_env(
            "MAX_UPLOAD_MB",
            get_env("MAX_UPLOAD_MB", Some(&DEFAULT_MAX_UPLOAD_MB.to_string()), is_prod)?,
        )?;
        let max_upload_bytes = upload_limit_bytes(max_upload_mb)?;

        let backend: AnalyzerBackend = get_env("ANALYZER_BACKEND", Some("mock"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let analyzer_url = env::var("ANALYZER_URL").ok();
        if backend == AnalyzerBackend::Remote && analyzer_url.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ANALYZER_URL is required when ANALYZER_BACKEND=remote"
            )));
        }

        Ok(ImagingConfig {
            common: common_config,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", Some("sqlite://imaging.db"), is_prod)?,
                max_connections: parse_env(
                    "DATABASE_MAX_CONNECTIONS",
                    get_env("DATABASE_MAX_CONNECTIONS", Some("5"), is_prod)?,
                )?,
            },
            storage: StorageConfig {
                upload_dir: get_env("UPLOAD_DIR", Some("app/uploads"), is_prod)?,
                max_upload_bytes,
            },
            analyzer: AnalyzerConfig {
                backend,
                url: analyzer_url,
                api_key: env::var("ANALYZER_API_KEY").ok(),
                timeout_secs: parse_env(
                    "ANALYZER_TIMEOUT_SECS",
                    get_env(
                        "ANALYZER_TIMEOUT_SECS",
                        Some(&DEFAULT_ANALYZER_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok(),
        })
    }
}

impl std::str::FromStr for AnalyzerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mock" => Ok(AnalyzerBackend::Mock),
            "remote" => Ok(AnalyzerBackend::Remote),
            _ => Err(format!("Invalid analyzer backend: {}", s)),
        }
    }
}

fn parse_env<T>(key: &str, raw: String) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid {} {:?}: {}", key, raw, e)))
}

fn upload_limit_bytes(max_upload_mb: usize) -> Result<usize, AppError> {
    max_upload_mb
        .checked_mul(1024 * 1024)
        .ok_or_else(|| {
            AppError::ConfigError(anyhow::anyhow!(
                "MAX_UPLOAD_MB {} exceeds the addressable size",
                max_upload_mb
            ))
        })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
