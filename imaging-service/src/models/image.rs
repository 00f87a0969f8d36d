use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An uploaded image as stored in the `images` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub storage_key: String,
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Creates a record for a file that is about to be written.
    ///
    /// `size` starts at zero and is filled in once the upload has been
    /// streamed to storage.
    pub fn new(filename: String, content_type: String) -> Self {
        let id = Uuid::new_v4().to_string();
        let storage_key = format!("{}-{}", id, filename);
        Self {
            id,
            filename,
            content_type,
            size: 0,
            storage_key,
            created_at: Utc::now(),
        }
    }
}
