//! Resource upload flow: select, dedup-check, metadata, transfer, finalize.
//!
//! This crate implements the **business logic** for uploading academic
//! resources from the mobile client to CampusVault. It is a library crate
//! with no UI or transport dependencies — the app shell provides
//! [`BackendClient`] and [`BlobStore`] implementations that bridge to the
//! actual HTTP client (`campusvault-api`).
//!
//! # Pipeline
//!
//! 1. **Select** — pick a document, enforce the size gate
//! 2. **Check** — chunked SHA-256 hash + content-addressed duplicate query
//! 3. **Metadata** — advisory AI suggestions for still-empty fields
//! 4. **Initiate** — obtain a one-time direct-upload target
//! 5. **Transfer** — stream bytes to storage with speed/ETA tracking
//! 6. **Finalize** — commit the resource record

pub mod backend;
pub mod dedup;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod picker;
pub mod session;

// Re-export primary types for convenience.
pub use backend::{ApiFuture, BackendClient, BlobStore, TransferTick};
pub use error::{ApiError, ErrorKind, UploadError};
pub use orchestrator::{DuplicateDecision, UploadConfig, UploadEvent, UploadOrchestrator};
pub use picker::{FilePicker, FsFilePicker, MAX_FILE_SIZE, PickError, PickOutcome};
pub use session::{FailedStage, Phase, SessionSnapshot, UploadSession};
