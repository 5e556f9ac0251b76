//! Upload pipeline: validation, metadata store, blob store and the service
//! that sequences them.

pub mod blob_store;
pub mod container;
pub mod image_service;
pub mod metadata_store;
pub mod validator;
