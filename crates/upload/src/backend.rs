//! Backend and blob-storage seams.
//!
//! The pipeline talks to the REST backend and the storage target through
//! these traits so the orchestrator stays transport-agnostic and testable
//! with mocks. `campusvault-api` provides the reqwest implementations.

use std::future::Future;
use std::pin::Pin;

use campusvault_protocol::messages::{
    DuplicateCheckRequest, DuplicateCheckResponse, FinalizeUploadRequest, GenerateMetadataRequest,
    GenerateMetadataResponse, InitiateUploadRequest, InitiateUploadResponse,
};
use campusvault_protocol::types::{ResourceRecord, SelectedFile, StoredBlob};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Boxed future returned by the transport traits.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// A raw progress tick from the direct-to-storage transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferTick {
    pub bytes_loaded: u64,
    pub bytes_total: u64,
}

/// REST backend operations consumed by the upload pipeline.
pub trait BackendClient: Send + Sync {
    /// `POST /resources/duplicate-check`
    fn check_duplicate(&self, req: DuplicateCheckRequest) -> ApiFuture<'_, DuplicateCheckResponse>;

    /// `POST /resources/metadata/generate` — advisory, callers swallow errors.
    fn generate_metadata(
        &self,
        req: GenerateMetadataRequest,
    ) -> ApiFuture<'_, GenerateMetadataResponse>;

    /// `POST /uploads/initiate`
    fn initiate_upload(&self, req: InitiateUploadRequest) -> ApiFuture<'_, InitiateUploadResponse>;

    /// `POST /uploads/finalize` — only after a confirmed transfer.
    fn finalize_upload(&self, req: FinalizeUploadRequest) -> ApiFuture<'_, ResourceRecord>;
}

/// Direct-to-storage byte transfer.
///
/// Streams the file to the one-time `upload_url` issued by the backend,
/// bypassing the backend for the bytes themselves. Implementations report
/// `(loaded, total)` ticks over `progress` (fire-and-forget, a full channel
/// must not stall the transfer) and stop promptly when `cancel` fires.
pub trait BlobStore: Send + Sync {
    fn put(
        &self,
        upload_url: String,
        file: SelectedFile,
        progress: mpsc::Sender<TransferTick>,
        cancel: CancellationToken,
    ) -> ApiFuture<'_, StoredBlob>;
}
