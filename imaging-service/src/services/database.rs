//! Database service for imaging-service.

use crate::models::{AnalysisReport, Image, Report};
use service_core::error::AppError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the connection pool, creating the database file if it is missing.
    #[instrument(skip(database_url), fields(service = "imaging-service"))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, AppError> {
        info!(max_connections = max_connections, "Connecting to SQLite");

        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::ConfigError(anyhow::anyhow!("Invalid DATABASE_URL: {}", e)))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("SQLite connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Close every pooled connection. Called once at shutdown.
    pub async fn close(&self) {
        info!("Closing SQLite connection pool");
        self.pool.close().await;
    }

    // -------------------------------------------------------------------------
    // Image Operations
    // -------------------------------------------------------------------------

    /// Persist an uploaded image together with its analysis report.
    ///
    /// Both rows are written in one transaction.
    #[instrument(skip(self, image, findings), fields(image_id = %image.id))]
    pub async fn save_image_and_report(
        &self,
        image: &Image,
        findings: &AnalysisReport,
    ) -> Result<Report, AppError> {
        let report = Report::new(image.id.clone(), findings.clone());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO images (id, filename, content_type, size, storage_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&image.id)
        .bind(&image.filename)
        .bind(&image.content_type)
        .bind(image.size)
        .bind(&image.storage_key)
        .bind(image.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert image: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO reports (id, image_id, findings, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&report.id)
        .bind(&report.image_id)
        .bind(&report.findings)
        .bind(report.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert report: {}", e)))?;

        tx.commit().await?;

        info!(report_id = %report.id, "Image and report saved");

        Ok(report)
    }

    /// Get an image by id.
    #[instrument(skip(self))]
    pub async fn get_image(&self, image_id: &str) -> Result<Option<Image>, AppError> {
        let image = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, filename, content_type, size, storage_key, created_at
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(image)
    }

    /// List images, newest first.
    #[instrument(skip(self))]
    pub async fn list_images(&self, limit: i64, offset: i64) -> Result<Vec<Image>, AppError> {
        let images = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, filename, content_type, size, storage_key, created_at
            FROM images
            ORDER BY created_at DESC, rowid DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(images)
    }

    pub async fn count_images(&self) -> Result<i64, AppError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM images")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // -------------------------------------------------------------------------
    // Report Operations
    // -------------------------------------------------------------------------

    /// Get a report by id.
    #[instrument(skip(self))]
    pub async fn get_report(&self, report_id: &str) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, image_id, findings, created_at
            FROM reports
            WHERE id = $1
            "#,
        )
        .bind(report_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    /// Get the report attached to an image.
    #[instrument(skip(self))]
    pub async fn get_report_for_image(&self, image_id: &str) -> Result<Option<Report>, AppError> {
        let report = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, image_id, findings, created_at
            FROM reports
            WHERE image_id = $1
            "#,
        )
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(report)
    }

    /// List reports, newest first, optionally restricted to one image.
    #[instrument(skip(self))]
    pub async fn list_reports(
        &self,
        image_id: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Report>, AppError> {
        let reports = sqlx::query_as::<_, Report>(
            r#"
            SELECT id, image_id, findings, created_at
            FROM reports
            WHERE ($1 IS NULL OR image_id = $1)
            ORDER BY created_at DESC, rowid DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(image_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(reports)
    }

    pub async fn count_reports(&self, image_id: Option<&str>) -> Result<i64, AppError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM reports WHERE ($1 IS NULL OR image_id = $1)")
                .bind(image_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
