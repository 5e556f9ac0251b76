//! HTTP surface tests using axum's test utilities.

mod common;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use common::{blob_names, gradient, jpeg_of_size, png, setup};
use http_body_util::BodyExt;
use image::ImageFormat;
use image_hosting::{app, config::MAX_FILE_SIZE};
use tower::ServiceExt;

const BOUNDARY: &str = "----image-hosting-test-boundary";

fn multipart_upload(field: &str, filename: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, bytes.to_vec())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn detail(body: &[u8]) -> String {
    let json: serde_json::Value = serde_json::from_slice(body).unwrap();
    json["detail"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn upload_serve_list_delete() {
    let env = setup().await;
    let app = app(env.service.clone());
    let data = jpeg_of_size(10 * 1024);

    let (status, _, body) = send(&app, multipart_upload("file", "cat.jpg", &data)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let url = json["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/images/") && url.ends_with(".jpg"), "{url}");

    let (status, headers, body) = send(&app, get(&url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(body, data);

    let (status, _, body) = send(&app, get("/images-list/?page=1&order=bogus")).await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    let filename = url.trim_start_matches("/images/");
    assert!(html.contains(filename));
    assert!(html.contains("cat.jpg"));

    let id = env.service.list(1, Default::default()).await.unwrap().images[0].id;
    let (status, headers, _) = send(&app, get(&format!("/delete/{id}"))).await;
    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/images-list/");

    let (status, _, _) = send(&app, get(&url)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _, body) = send(&app, get(&format!("/delete/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(detail(&body).contains(&id.to_string()));
}

#[tokio::test]
async fn validation_failures_are_bad_requests() {
    let env = setup().await;
    let app = app(env.service.clone());

    let (status, _, body) = send(&app, multipart_upload("file", "notes.txt", b"hello")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("Unsupported file format"));

    let (status, _, body) = send(&app, multipart_upload("file", "fake.gif", b"not a gif")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("not a valid image"));

    let mut oversized = png();
    oversized.resize(MAX_FILE_SIZE + 4096, 0);
    let (status, _, body) = send(&app, multipart_upload("file", "huge.png", &oversized)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("too large"));

    let mut truncated = gradient(ImageFormat::Jpeg);
    truncated.truncate(truncated.len() / 2);
    let (status, _, body) = send(&app, multipart_upload("file", "half.jpg", &truncated)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("not a valid image"));

    assert!(blob_names(&env.service.blobs.base_path).is_empty());
}

#[tokio::test]
async fn upload_requires_file_field() {
    let env = setup().await;
    let app = app(env.service.clone());

    let (status, _, body) = send(&app, multipart_upload("picture", "a.png", &png())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(detail(&body).contains("`file`"));
}

#[tokio::test]
async fn listing_rejects_page_zero() {
    let env = setup().await;
    let app = app(env.service.clone());

    let (status, _, _) = send(&app, get("/images-list/?page=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) = send(&app, get("/images-list/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(String::from_utf8(body).unwrap().contains("No images uploaded yet."));
}

#[tokio::test]
async fn serving_rejects_non_generated_names() {
    let env = setup().await;
    let app = app(env.service.clone());
    std::fs::write(env.service.blobs.path_for("secret.png"), b"x").unwrap();

    let (status, _, _) = send(&app, get("/images/secret.png")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_endpoints_report_healthy() {
    let env = setup().await;
    let app = app(env.service.clone());

    let (status, _, body) = send(&app, get("/healthz")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");

    let (status, _, body) = send(&app, get("/readyz")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["checks"]["database"]["ok"], true);
    assert_eq!(json["checks"]["disk"]["ok"], true);
}

#[tokio::test]
async fn readiness_fails_without_upload_dir() {
    let env = setup().await;
    let app = app(env.service.clone());
    std::fs::remove_dir_all(&env.service.blobs.base_path).unwrap();

    let (status, _, body) = send(&app, get("/readyz")).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["checks"]["disk"]["ok"], false);
}
