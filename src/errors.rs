use crate::services::{image_service::ImageError, validator::ValidationError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "detail": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<ImageError> for AppError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::Validation(ValidationError::UnsupportedFormat { .. }) => {
                AppError::bad_request(
                    "Unsupported file format. Only .jpg, .jpeg, .png and .gif are allowed",
                )
            }
            ImageError::Validation(ValidationError::TooLarge { .. }) => {
                AppError::bad_request("File is too large. The maximum size is 5 MB")
            }
            ImageError::Validation(ValidationError::CorruptImage(_)) => {
                AppError::bad_request("The uploaded file is not a valid image")
            }
            ImageError::Validation(ValidationError::Read(_)) => {
                AppError::bad_request("The uploaded file could not be read")
            }
            ImageError::InvalidPage(page) => {
                AppError::bad_request(format!("Page must be at least 1, got {}", page))
            }
            ImageError::NotFound(id) => {
                AppError::not_found(format!("Image with id={} not found", id))
            }
            ImageError::MetadataWriteFailed { .. } => {
                AppError::internal("Failed to save image metadata. The file was not stored")
            }
            ImageError::BlobWriteFailed { .. } => AppError::internal("Failed to save the file"),
            ImageError::Store { .. } => AppError::internal("Failed to execute the query"),
            ImageError::StoreUnavailable(_) => {
                AppError::internal("The image database is unavailable")
            }
        }
    }
}
