//! HTTP handlers for uploading, listing, serving and deleting images.
//! Storage concerns are delegated to `ImageService`.

use crate::{
    errors::AppError,
    models::image_record::SortOrder,
    services::image_service::{ImageService, is_generated_filename},
    views::render_listing,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use bytes::BytesMut;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, ErrorKind};
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

/// Multipart field carrying the image.
pub const UPLOAD_FIELD: &str = "file";

/// Where a successful delete redirects to.
pub const LISTING_PATH: &str = "/images-list/";

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Query params accepted by the listing page.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<i64>,
    pub order: Option<String>,
}

/// `POST /upload` — multipart upload of a single image in field `file`.
pub async fn upload_image(
    State(service): State<ImageService>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let limit = service.limits.max_file_size;

    while let Some(mut field) = multipart.next_field().await.map_err(|err| {
        warn!("malformed multipart body: {}", err);
        AppError::bad_request("Malformed multipart body")
    })? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let declared = field.file_name().unwrap_or_default().to_string();

        // Anything past limit + 1 bytes is rejected by the validator anyway.
        let mut buf = BytesMut::new();
        while let Some(chunk) = field.chunk().await.map_err(|err| {
            warn!(declared = %declared, "failed to read upload body: {}", err);
            AppError::bad_request("The uploaded file could not be read")
        })? {
            buf.extend_from_slice(&chunk);
            if buf.len() > limit {
                break;
            }
        }

        let mut reader = Cursor::new(buf.freeze());
        let uploaded = service.upload(&mut reader, &declared).await?;
        return Ok(Json(UploadResponse { url: uploaded.url }));
    }

    Err(AppError::bad_request(format!(
        "Multipart field `{}` is required",
        UPLOAD_FIELD
    )))
}

/// `GET /images-list/?page=&order=` — rendered listing page.
pub async fn images_list(
    State(service): State<ImageService>,
    Query(q): Query<ListQuery>,
) -> Result<Html<String>, AppError> {
    let order = q
        .order
        .as_deref()
        .map(SortOrder::from_param)
        .unwrap_or_default();
    let page = service.list(q.page.unwrap_or(1), order).await?;

    let html = render_listing(&page).map_err(|err| {
        error!("failed to render listing: {}", err);
        AppError::internal("Failed to render the listing")
    })?;
    Ok(Html(html))
}

/// `GET /delete/{id}` — delete and redirect back to the listing.
pub async fn delete_image(
    State(service): State<ImageService>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    service.delete(id).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, LISTING_PATH)]).into_response())
}

/// `GET /images/{filename}` — stream a stored image.
pub async fn get_image(
    State(service): State<ImageService>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    if !is_generated_filename(&filename, &service.limits.allowed_extensions) {
        return Err(AppError::not_found("Image not found"));
    }

    let file = service.blobs.open(&filename).await.map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            AppError::not_found("Image not found")
        } else {
            error!(filename = %filename, "failed to open blob: {}", err);
            AppError::internal("Failed to read the image")
        }
    })?;
    let length = file.metadata().await.ok().map(|m| m.len());

    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&filename)),
    );
    if let Some(length) = length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok(response)
}

fn content_type_for(filename: &str) -> &'static str {
    if filename.ends_with(".png") {
        "image/png"
    } else if filename.ends_with(".gif") {
        "image/gif"
    } else {
        "image/jpeg"
    }
}
