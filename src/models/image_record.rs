//! Represents an uploaded image tracked by the metadata store.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Display pattern for upload timestamps on the listing page.
pub const UPLOAD_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single row of the `images` table.
///
/// Records are never mutated after insert. The blob they describe lives in the
/// upload directory under `filename`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq, Eq)]
pub struct ImageRecord {
    /// Store-assigned identifier.
    pub id: i64,

    /// Generated name of the blob on disk (`<32 hex chars><.ext>`).
    pub filename: String,

    /// Name supplied by the client. Untrusted; display only.
    pub original_name: String,

    /// Size in kilobytes (byte length / 1024, rounded down).
    pub size: i64,

    /// Lower-cased extension without the leading dot, e.g. `jpg`.
    pub file_type: String,

    /// Assigned by the store at insert.
    pub upload_time: Option<NaiveDateTime>,
}

/// Fields supplied by the caller when inserting a record.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub filename: String,
    pub original_name: String,
    pub size: i64,
    pub file_type: String,
}

/// Listing-page projection of [`ImageRecord`] with a preformatted timestamp.
#[derive(Serialize, Clone, Debug)]
pub struct ImageView {
    pub id: i64,
    pub filename: String,
    pub original_name: String,
    pub size: i64,
    pub file_type: String,
    pub upload_time: String,
}

impl From<ImageRecord> for ImageView {
    fn from(record: ImageRecord) -> Self {
        Self {
            id: record.id,
            filename: record.filename,
            original_name: record.original_name,
            size: record.size,
            file_type: record.file_type,
            upload_time: format_upload_time(record.upload_time),
        }
    }
}

/// Format an upload timestamp for display; absent timestamps render empty.
pub fn format_upload_time(time: Option<NaiveDateTime>) -> String {
    time.map(|t| t.format(UPLOAD_TIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Listing order by upload time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Parse a query value. Unknown values fall back to descending.
    pub fn from_param(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}
