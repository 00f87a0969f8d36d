use async_trait::async_trait;
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWrite};

pub type StorageWriter = Box<dyn AsyncWrite + Send + Unpin>;
pub type StorageReader = Box<dyn AsyncRead + Send + Unpin>;

#[async_trait]
pub trait Storage: Send + Sync {
    /// Opens `key` for writing, truncating anything already stored there.
    async fn writer(&self, key: &str) -> Result<StorageWriter, AppError>;
    async fn reader(&self, key: &str) -> Result<StorageReader, AppError>;
    async fn delete(&self, key: &str) -> Result<(), AppError>;
    /// Local filesystem path of `key`, handed to the analyzer.
    fn path_for(&self, key: &str) -> PathBuf;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await.map_err(|e| {
                AppError::StorageError(anyhow::anyhow!(
                    "Failed to create upload directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;
        }
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn writer(&self, key: &str) -> Result<StorageWriter, AppError> {
        let path = self.path_for(key);
        let file = fs::File::create(&path).await.map_err(|e| {
            AppError::StorageError(anyhow::anyhow!(
                "Failed to create {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Box::new(file))
    }

    async fn reader(&self, key: &str) -> Result<StorageReader, AppError> {
        let path = self.path_for(key);
        match fs::File::open(&path).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound(
                anyhow::anyhow!("Stored file {} is missing", key),
            )),
            Err(e) => Err(AppError::StorageError(anyhow::Error::new(e))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(key)
    }
}

/// Reduces a client-supplied file name to its final path component.
///
/// Both `/` and `\` are treated as separators. Returns `None` when nothing
/// usable is left.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return None;
    }
    Some(name.to_string())
}
