//! Content-addressed duplicate check.
//!
//! Composes the chunked hasher (progress weighted 0–50%) with the backend
//! digest query (50–100%). A backend failure is always an error result,
//! never a silent "not a duplicate".

use std::path::PathBuf;

use campusvault_protocol::messages::DuplicateCheckRequest;
use campusvault_protocol::types::{DuplicateCheckResult, FileDigest, SelectedFile};
use tokio::sync::mpsc;
use tracing::debug;

use crate::backend::BackendClient;
use crate::error::UploadError;

/// Runs the duplicate check for `file` against `course_unit_id`.
///
/// When `cached_digest` is present the hash step is skipped entirely — the
/// digest is a pure function of the file bytes, so re-running the check
/// after a course-unit change or a network retry never re-reads the file.
/// Weighted progress fractions in `[0, 1]` are sent over `progress`
/// (fire-and-forget).
///
/// Returns the digest alongside the verdict so callers can cache it for
/// the finalize step.
pub async fn check_duplicate(
    backend: &dyn BackendClient,
    course_unit_id: i64,
    file: &SelectedFile,
    cached_digest: Option<FileDigest>,
    chunk_size: usize,
    progress: mpsc::Sender<f64>,
) -> Result<(FileDigest, DuplicateCheckResult), UploadError> {
    let digest = match cached_digest {
        Some(digest) => {
            debug!(digest = %digest, "reusing cached digest for duplicate check");
            let _ = progress.send(0.5).await;
            digest
        }
        None => {
            let path = PathBuf::from(&file.uri);
            let chunk_size = if chunk_size == 0 {
                campusvault_transfer::DEFAULT_CHUNK_SIZE
            } else {
                chunk_size
            };

            let (tick_tx, mut tick_rx) = mpsc::channel::<f64>(32);
            let hash_task = tokio::task::spawn_blocking(move || {
                let mut on_progress = |fraction: f64| {
                    let _ = tick_tx.blocking_send(fraction);
                };
                campusvault_transfer::hash_file(&path, chunk_size, &mut on_progress)
            });

            // The tick channel closes when the blocking task drops its sender,
            // so this loop ends before the join below resolves.
            while let Some(fraction) = tick_rx.recv().await {
                let _ = progress.send(fraction * 0.5).await;
            }

            hash_task
                .await
                .map_err(|e| {
                    UploadError::HashComputation(campusvault_transfer::TransferError::Io(
                        std::io::Error::other(format!("hash task join error: {e}")),
                    ))
                })??
        }
    };

    let req = DuplicateCheckRequest {
        course_unit_id,
        sha256: digest.hex.clone(),
        filename: file.name.clone(),
        size_bytes: file.size_bytes,
    };
    let resp = backend
        .check_duplicate(req)
        .await
        .map_err(UploadError::from_api)?;
    let _ = progress.send(1.0).await;

    debug!(
        course_unit_id,
        duplicate = resp.duplicate,
        "duplicate check resolved"
    );

    Ok((
        digest,
        DuplicateCheckResult {
            is_duplicate: resp.duplicate,
            existing: resp.existing,
            similarity_score: resp.similarity_score,
        },
    ))
}
