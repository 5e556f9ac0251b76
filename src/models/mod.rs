//! Core data models for the image hosting service.
//!
//! These map to the `images` table via `sqlx::FromRow` and serialize as JSON
//! or template context via `serde`.

pub mod image_record;
