//! Upload validation.
//!
//! Runs three checks in order, each short-circuiting the rest:
//! 1. extension against the allow-list,
//! 2. buffered size against the ceiling (inclusive),
//! 3. an integrity check: the container is walked to its end marker and its
//!    header must report non-zero dimensions. Pixel data is not decoded.
//!
//! The reader is rewound to its start on every exit path.

use crate::{config::UploadLimits, services::container};
use bytes::Bytes;
use image::{ImageFormat, ImageReader};
use std::io::{self, Cursor, SeekFrom};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("unsupported file format `{extension}`")]
    UnsupportedFormat { extension: String },
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("file is not a valid image: {0}")]
    CorruptImage(String),
    #[error("failed to read upload: {0}")]
    Read(#[from] io::Error),
}

/// An upload that passed every check, fully buffered.
#[derive(Debug, Clone)]
pub struct ValidatedImage {
    pub bytes: Bytes,
    pub size_bytes: usize,
    /// Lower-cased, leading dot kept (e.g. `.jpg`).
    pub extension: String,
}

impl ValidatedImage {
    /// Extension without the leading dot, as stored in `images.file_type`.
    pub fn file_type(&self) -> &str {
        self.extension.trim_start_matches('.')
    }

    pub fn size_kb(&self) -> i64 {
        (self.size_bytes / 1024) as i64
    }
}

#[derive(Debug, Clone)]
pub struct ImageValidator {
    max_file_size: usize,
    allowed_extensions: Vec<String>,
}

impl ImageValidator {
    pub fn new(limits: &UploadLimits) -> Self {
        Self {
            max_file_size: limits.max_file_size,
            allowed_extensions: limits.allowed_extensions.clone(),
        }
    }

    /// Validate `reader` as an upload named `declared_filename`.
    ///
    /// Whatever the outcome, the reader is seeked back to position 0 before
    /// this returns.
    pub async fn validate<R>(
        &self,
        reader: &mut R,
        declared_filename: &str,
    ) -> Result<ValidatedImage, ValidationError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let outcome = self.inspect(reader, declared_filename).await;

        if let Err(err) = reader.seek(SeekFrom::Start(0)).await {
            warn!(declared = %declared_filename, error = %err, "failed to rewind upload");
        }

        match &outcome {
            Ok(image) => info!(
                declared = %declared_filename,
                size = image.size_bytes,
                "upload passed validation"
            ),
            Err(err) => info!(declared = %declared_filename, reason = %err, "upload rejected"),
        }
        outcome
    }

    async fn inspect<R>(
        &self,
        reader: &mut R,
        declared_filename: &str,
    ) -> Result<ValidatedImage, ValidationError>
    where
        R: AsyncRead + AsyncSeek + Unpin,
    {
        let extension = self.check_extension(declared_filename)?;

        // One byte past the ceiling is enough to know the upload is too large.
        let mut buf = Vec::new();
        (&mut *reader)
            .take(self.max_file_size as u64 + 1)
            .read_to_end(&mut buf)
            .await?;
        if buf.len() > self.max_file_size {
            return Err(ValidationError::TooLarge {
                limit: self.max_file_size,
            });
        }

        verify_image(&buf)?;

        let size_bytes = buf.len();
        Ok(ValidatedImage {
            bytes: Bytes::from(buf),
            size_bytes,
            extension,
        })
    }

    /// Extract the lower-cased extension (with dot) and match it against the
    /// allow-list.
    ///
    /// The extension is whatever follows the last `.` of the final path
    /// component; leading dots do not start an extension, so `.png` has none.
    pub fn check_extension(&self, declared_filename: &str) -> Result<String, ValidationError> {
        let extension = extension_of(declared_filename)
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_default();

        if self.allowed_extensions.iter().any(|a| *a == extension) {
            Ok(extension)
        } else {
            Err(ValidationError::UnsupportedFormat { extension })
        }
    }
}

fn extension_of(declared_filename: &str) -> Option<&str> {
    let last_component = declared_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let (_, ext) = last_component.trim_start_matches('.').rsplit_once('.')?;
    Some(ext)
}

/// Check the container from signature to end marker, then read the
/// dimensions from its header. Any failure, whatever its cause, is reported
/// as `CorruptImage`.
fn verify_image(bytes: &[u8]) -> Result<(), ValidationError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|err| ValidationError::CorruptImage(err.to_string()))?;

    let format = match reader.format() {
        Some(format @ (ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::Gif)) => format,
        Some(other) => {
            return Err(ValidationError::CorruptImage(format!(
                "unexpected {:?} container",
                other
            )));
        }
        None => {
            return Err(ValidationError::CorruptImage(
                "unrecognized image container".into(),
            ));
        }
    };

    // The header alone says nothing about truncation.
    container::check_complete(format, bytes).map_err(ValidationError::CorruptImage)?;

    let (width, height) = reader
        .into_dimensions()
        .map_err(|err| ValidationError::CorruptImage(err.to_string()))?;
    if width == 0 || height == 0 {
        return Err(ValidationError::CorruptImage("empty image".into()));
    }
    Ok(())
}
