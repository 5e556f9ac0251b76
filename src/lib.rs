//! Image upload and hosting service.
//!
//! Uploads are validated, recorded in SQLite and written to a flat upload
//! directory under a generated name. Records can be listed page by page and
//! deleted.

use axum::Router;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod views;

use services::image_service::ImageService;

/// Router with all routes bound to `service`.
pub fn app(service: ImageService) -> Router {
    let max_file_size = service.limits.max_file_size;
    routes::routes::routes(max_file_size).with_state(service)
}
