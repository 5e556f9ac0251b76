//! Shared fixtures: a service over a temporary SQLite file and upload directory.

#![allow(dead_code)]

use image::{ImageFormat, Rgb, RgbImage};
use image_hosting::{
    config::UploadLimits,
    services::{blob_store::BlobStore, image_service::ImageService, metadata_store::MetadataStore},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::Cursor, path::Path, sync::Arc};
use tempfile::TempDir;

pub struct TestEnv {
    pub service: ImageService,
    // Keeps the directory alive for the duration of the test.
    pub dir: TempDir,
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();

    let options = SqliteConnectOptions::new()
        .filename(dir.path().join("images.db"))
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .unwrap();

    let blobs = BlobStore::new(dir.path().join("images"));
    blobs.ensure_root().await.unwrap();

    let service = ImageService::from_parts(
        &UploadLimits::default(),
        MetadataStore::new(Arc::new(pool)),
        blobs,
    );
    service.metadata.migrate().await.unwrap();

    TestEnv { service, dir }
}

fn encode(format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbImage::from_pixel(32, 32, Rgb([10, 120, 240]))
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

/// A 64x64 gradient, large enough that cutting it lands inside pixel data.
pub fn gradient(format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    RgbImage::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]))
        .write_to(&mut Cursor::new(&mut buf), format)
        .unwrap();
    buf
}

/// A valid JPEG padded with trailing bytes to exactly `len` bytes.
pub fn jpeg_of_size(len: usize) -> Vec<u8> {
    let mut bytes = encode(ImageFormat::Jpeg);
    assert!(bytes.len() <= len, "encoded jpeg larger than {len}");
    bytes.resize(len, 0);
    bytes
}

/// A valid PNG padded with trailing bytes to exactly `len` bytes.
pub fn png_of_size(len: usize) -> Vec<u8> {
    let mut bytes = encode(ImageFormat::Png);
    assert!(bytes.len() <= len, "encoded png larger than {len}");
    bytes.resize(len, 0);
    bytes
}

pub fn png() -> Vec<u8> {
    encode(ImageFormat::Png)
}

/// Names of stored blobs, ignoring hidden temp files.
pub fn blob_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| !n.starts_with('.'))
        .collect();
    names.sort();
    names
}

pub fn is_hex32(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
