//! Defines routes for the image hosting service.
//!
//! - `POST /upload`              — multipart upload, returns `{"url": ...}`
//! - `GET  /images-list/`        — paginated HTML listing (`?page=&order=`)
//! - `GET  /images/{filename}`   — stored image bytes
//! - `GET  /delete/{id}`         — delete, then redirect to the listing
//! - `GET  /healthz`, `/readyz`  — health checks

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        image_handlers::{delete_image, get_image, images_list, upload_image},
    },
    services::image_service::ImageService,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

/// Room for multipart framing on top of the file itself.
const MULTIPART_SLACK: usize = 1024 * 1024;

/// Build the router. `max_file_size` sizes the upload body limit.
pub fn routes(max_file_size: usize) -> Router<ImageService> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route(
            "/upload",
            post(upload_image).layer(DefaultBodyLimit::max(max_file_size + MULTIPART_SLACK)),
        )
        .route("/images-list/", get(images_list))
        .route("/images-list", get(images_list))
        .route("/images/{filename}", get(get_image))
        .route("/delete/{id}", get(delete_image))
}
