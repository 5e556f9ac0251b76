//! On-disk blob storage for image payloads.
//!
//! Blobs live flat under `base_path`, named by generated identifiers only.

use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct BlobStore {
    /// Directory holding every stored image.
    pub base_path: PathBuf,
}

impl BlobStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create the upload directory if it does not exist yet.
    pub async fn ensure_root(&self) -> io::Result<()> {
        fs::create_dir_all(&self.base_path).await
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.base_path.join(filename)
    }

    /// Write `bytes` under `filename`.
    ///
    /// Data goes to a hidden temp file first, is fsynced, then renamed into
    /// place. The temp file is removed on any failure. The upload directory
    /// must already exist.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let final_path = self.path_for(filename);
        let tmp_path = self.base_path.join(format!(".tmp-{}", Uuid::new_v4()));

        if let Err(err) = write_synced(&tmp_path, bytes).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        if let Err(err) = fs::rename(&tmp_path, &final_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(err);
        }

        debug!("wrote blob {}", final_path.display());
        Ok(final_path)
    }

    /// Remove a blob. Returns `Ok(false)` when it was already absent.
    pub async fn remove(&self, filename: &str) -> io::Result<bool> {
        let path = self.path_for(filename);
        match fs::remove_file(&path).await {
            Ok(_) => {
                debug!("removed blob {}", path.display());
                Ok(true)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Open a blob for streaming.
    pub async fn open(&self, filename: &str) -> io::Result<File> {
        File::open(self.path_for(filename)).await
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_all().await
}
