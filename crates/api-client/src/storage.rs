//! Direct-to-storage blob transfer.
//!
//! Streams the file body to the one-time upload URL issued by the backend,
//! reporting `(loaded, total)` ticks as chunks leave the reader. Progress
//! sends are fire-and-forget so a slow consumer never stalls the transfer.

use std::time::Duration;

use campusvault_protocol::types::{SelectedFile, StoredBlob};
use campusvault_upload::{ApiError, ApiFuture, BlobStore, TransferTick};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{check_status, map_transport};

const READ_CHUNK_SIZE: usize = 64 * 1024;

/// [`BlobStore`] backed by an HTTP `PUT` to the issued upload target.
///
/// No Bearer token is attached: the upload URL itself carries the one-time
/// authorization.
pub struct HttpBlobStore {
    http: reqwest::Client,
}

impl HttpBlobStore {
    /// No overall deadline is set: a large transfer on a slow link may
    /// legitimately take minutes, and progress ticks are the liveness
    /// signal. Cancellation comes from the token.
    pub fn new() -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }

    /// Caps the whole transfer, for callers that want a hard deadline.
    pub fn with_timeout(timeout: Duration) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http })
    }
}

impl BlobStore for HttpBlobStore {
    fn put(
        &self,
        upload_url: String,
        file: SelectedFile,
        progress: mpsc::Sender<TransferTick>,
        cancel: CancellationToken,
    ) -> ApiFuture<'_, StoredBlob> {
        Box::pin(async move {
            let handle = tokio::fs::File::open(&file.uri)
                .await
                .map_err(|e| ApiError::Network(format!("failed to open {}: {e}", file.uri)))?;

            let bytes_total = file.size_bytes;
            let mut bytes_loaded = 0u64;
            let tick_tx = progress.clone();
            let stream =
                ReaderStream::with_capacity(handle, READ_CHUNK_SIZE).map(move |chunk| {
                    if let Ok(bytes) = &chunk {
                        bytes_loaded += bytes.len() as u64;
                        let _ = tick_tx.try_send(TransferTick {
                            bytes_loaded,
                            bytes_total,
                        });
                    }
                    chunk
                });

            debug!(url = %upload_url, size = bytes_total, "starting blob transfer");
            let request = self
                .http
                .put(&upload_url)
                .header("Content-Type", &file.mime_type)
                .header("Content-Length", bytes_total)
                .body(reqwest::Body::wrap_stream(stream));

            let response = tokio::select! {
                response = request.send() => response.map_err(map_transport)?,
                _ = cancel.cancelled() => {
                    return Err(ApiError::Network("transfer cancelled".into()));
                }
            };
            let response = check_status(response).await?;

            let blob: StoredBlob = response
                .json()
                .await
                .map_err(|e| ApiError::Network(format!("failed to parse storage response: {e}")))?;

            let _ = progress
                .send(TransferTick {
                    bytes_loaded: bytes_total,
                    bytes_total,
                })
                .await;
            info!(file_id = %blob.file_id, "blob stored");
            Ok(blob)
        })
    }
}
