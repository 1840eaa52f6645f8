pub mod admin;
pub mod auth;
pub mod blobstore;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod reporting;
pub mod repositories;
pub mod service;

pub use admin::AdminService;
pub use blobstore::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use connection::{connect, connect_memory, DbPool};
pub use fixtures::{SeedDataset, SeedResult, VerificationResult};
pub use service::{NewAttachment, RequestDetail, RequestService, ServiceError};
