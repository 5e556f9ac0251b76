//! ImageService: upload, listing and deletion of hosted images.
//!
//! Sequences the validator, the SQLite metadata store and the on-disk blob
//! store. Holds no mutable state of its own; every request works against the
//! two stores independently.

use crate::{
    config::{AppConfig, UploadLimits},
    models::image_record::{ImageRecord, ImageView, NewImage, SortOrder},
    services::{
        blob_store::BlobStore,
        metadata_store::MetadataStore,
        validator::{ImageValidator, ValidationError},
    },
};
use sqlx::SqlitePool;
use std::{io, sync::Arc};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek};
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to record metadata for `{filename}`: {source}")]
    MetadataWriteFailed {
        filename: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("failed to write blob `{filename}`: {source}")]
    BlobWriteFailed {
        filename: String,
        #[source]
        source: io::Error,
    },
    #[error("image with id={0} not found")]
    NotFound(i64),
    #[error("page must be at least 1, got {0}")]
    InvalidPage(i64),
    #[error("metadata store {operation} failed: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("metadata store unavailable: {0}")]
    StoreUnavailable(#[source] sqlx::Error),
}

pub type ImageResult<T> = Result<T, ImageError>;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Public reference, `<prefix>/<filename>`.
    pub url: String,
    pub record: ImageRecord,
}

/// One page of the listing.
#[derive(Debug, Clone)]
pub struct ImagePage {
    pub images: Vec<ImageView>,
    pub page: i64,
    pub total_pages: i64,
    pub order: SortOrder,
}

#[derive(Clone)]
pub struct ImageService {
    pub validator: ImageValidator,
    pub metadata: MetadataStore,
    pub blobs: BlobStore,
    pub limits: UploadLimits,
}

impl ImageService {
    /// Build the service from configuration and an open pool.
    pub fn new(cfg: &AppConfig, db: Arc<SqlitePool>) -> Self {
        Self::from_parts(
            &cfg.limits,
            MetadataStore::new(db),
            BlobStore::new(cfg.upload_dir.clone()),
        )
    }

    pub fn from_parts(limits: &UploadLimits, metadata: MetadataStore, blobs: BlobStore) -> Self {
        Self {
            validator: ImageValidator::new(limits),
            metadata,
            blobs,
            limits: limits.clone(),
        }
    }

    /// Startup health check against the metadata store.
    pub async fn check_store(&self) -> ImageResult<()> {
        self.metadata
            .ping()
            .await
            .map_err(ImageError::StoreUnavailable)
    }

    /// Validate and persist an upload, returning its public URL.
    ///
    /// Ordering: the metadata row is inserted first, then the blob is written.
    /// A failed insert aborts before anything touches the disk. A failed blob
    /// write after a successful insert is reported, and the row is left in
    /// place (an orphan row) for later reconciliation.
    pub async fn upload<R>(
        &self,
        reader: &mut R,
        declared_filename: &str,
    ) -> ImageResult<UploadedImage>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        info!(declared = %declared_filename, "starting upload");

        let validated = self.validator.validate(reader, declared_filename).await?;
        let filename = generate_filename(&validated.extension);

        let new_image = NewImage {
            filename: filename.clone(),
            original_name: declared_filename.to_string(),
            size: validated.size_kb(),
            file_type: validated.file_type().to_string(),
        };

        let record = match self.metadata.insert(&new_image).await {
            Ok(record) => record,
            Err(source) => {
                error!(
                    declared = %declared_filename,
                    filename = %filename,
                    error = %source,
                    "metadata insert failed, blob not written"
                );
                return Err(ImageError::MetadataWriteFailed { filename, source });
            }
        };

        if let Err(source) = self.blobs.write(&filename, &validated.bytes).await {
            error!(
                id = record.id,
                declared = %declared_filename,
                filename = %filename,
                error = %source,
                "blob write failed after metadata insert, row left in place"
            );
            return Err(ImageError::BlobWriteFailed { filename, source });
        }

        let url = format!(
            "{}/{}",
            self.limits.public_prefix.trim_end_matches('/'),
            filename
        );
        info!(
            id = record.id,
            declared = %declared_filename,
            filename = %filename,
            url = %url,
            "upload stored"
        );

        Ok(UploadedImage { url, record })
    }

    /// Return page `page` (1-based) of the listing, ordered by upload time.
    pub async fn list(&self, page: i64, order: SortOrder) -> ImageResult<ImagePage> {
        if page < 1 {
            return Err(ImageError::InvalidPage(page));
        }
        let page_size = self.limits.page_size;
        let offset = (page - 1).saturating_mul(page_size);

        let (records, total) = self
            .metadata
            .query_page(page_size, offset, order)
            .await
            .map_err(|source| {
                error!(page, order = order.as_str(), error = %source, "listing query failed");
                ImageError::Store {
                    operation: "listing",
                    source,
                }
            })?;

        Ok(ImagePage {
            images: records.into_iter().map(ImageView::from).collect(),
            page,
            total_pages: total_pages(total, page_size),
            order,
        })
    }

    /// Delete the record with `id` and then its blob.
    ///
    /// A blob that is already missing, or that cannot be removed, is logged
    /// and does not fail the deletion: the row is gone at that point.
    pub async fn delete(&self, id: i64) -> ImageResult<()> {
        let filename = self.metadata.delete_by_id(id).await.map_err(|source| {
            error!(id, error = %source, "metadata delete failed");
            ImageError::Store {
                operation: "delete",
                source,
            }
        })?;

        let Some(filename) = filename else {
            warn!(id, "no image with this id");
            return Err(ImageError::NotFound(id));
        };

        match self.blobs.remove(&filename).await {
            Ok(true) => {}
            Ok(false) => warn!(id, filename = %filename, "blob already missing on disk"),
            Err(err) => error!(
                id,
                filename = %filename,
                error = %err,
                "failed to remove blob after metadata delete"
            ),
        }

        info!(id, filename = %filename, "image deleted");
        Ok(())
    }
}

/// Generated blob name: 128 random bits as 32 lowercase hex chars, plus the
/// lower-cased extension.
pub fn generate_filename(extension: &str) -> String {
    format!("{}{}", Uuid::new_v4().simple(), extension)
}

/// Whether `name` has the shape produced by [`generate_filename`] with one of
/// the allowed extensions.
pub fn is_generated_filename(name: &str, allowed_extensions: &[String]) -> bool {
    let Some((stem, ext)) = name.split_at_checked(32) else {
        return false;
    };
    stem.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        && allowed_extensions.iter().any(|a| a == ext)
}

pub fn total_pages(total: i64, page_size: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ALLOWED_EXTENSIONS;

    fn allowed() -> Vec<String> {
        ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn generated_names_are_hex_plus_extension() {
        let name = generate_filename(".jpeg");
        assert_eq!(name.len(), 32 + ".jpeg".len());
        assert!(name.ends_with(".jpeg"));
        assert!(is_generated_filename(&name, &allowed()));
        assert_ne!(generate_filename(".png"), generate_filename(".png"));
    }

    #[test]
    fn rejects_foreign_names() {
        let allowed = allowed();
        assert!(!is_generated_filename("../etc/passwd", &allowed));
        assert!(!is_generated_filename("short.png", &allowed));
        assert!(!is_generated_filename(
            "0123456789ABCDEF0123456789abcdef.png",
            &allowed
        ));
        assert!(!is_generated_filename(
            "0123456789abcdef0123456789abcdef.exe",
            &allowed
        ));
        assert!(is_generated_filename(
            "0123456789abcdef0123456789abcdef.gif",
            &allowed
        ));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
