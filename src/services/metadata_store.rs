//! SQLite-backed metadata store for image records.
//!
//! Each operation is a single statement against the shared pool, so
//! connection and transaction scope never leak to callers.

use crate::models::image_record::{ImageRecord, NewImage, SortOrder};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::debug;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Clone)]
pub struct MetadataStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl MetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema. Every statement is idempotent.
    pub async fn migrate(&self) -> Result<(), sqlx::Error> {
        let statements = SCHEMA
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        debug!("Running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Round-trip a trivial query to prove the store is reachable.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await
            .map(|_| ())
    }

    /// Insert a record; the store assigns `id` and `upload_time`.
    pub async fn insert(&self, image: &NewImage) -> Result<ImageRecord, sqlx::Error> {
        sqlx::query_as::<_, ImageRecord>(
            "INSERT INTO images (filename, original_name, size, file_type)
             VALUES (?, ?, ?, ?)
             RETURNING id, filename, original_name, size, file_type, upload_time",
        )
        .bind(&image.filename)
        .bind(&image.original_name)
        .bind(image.size)
        .bind(&image.file_type)
        .fetch_one(&*self.db)
        .await
    }

    /// Fetch one page ordered by upload time, together with the total row count.
    ///
    /// The count and the page are separate statements; a concurrent insert or
    /// delete between them can leave the count stale.
    pub async fn query_page(
        &self,
        limit: i64,
        offset: i64,
        order: SortOrder,
    ) -> Result<(Vec<ImageRecord>, i64), sqlx::Error> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM images")
            .fetch_one(&*self.db)
            .await?;

        let sql = format!(
            "SELECT id, filename, original_name, size, file_type, upload_time
             FROM images
             ORDER BY upload_time {dir}, id {dir}
             LIMIT ? OFFSET ?",
            dir = order.as_sql()
        );
        let records = sqlx::query_as::<_, ImageRecord>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&*self.db)
            .await?;

        Ok((records, total))
    }

    /// Delete a record and return its blob filename, or `None` if no row matched.
    pub async fn delete_by_id(&self, id: i64) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>("DELETE FROM images WHERE id = ? RETURNING filename")
            .bind(id)
            .fetch_optional(&*self.db)
            .await
    }
}
