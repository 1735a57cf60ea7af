//! Upload orchestrator.
//!
//! Drives one upload session through selection → hash/duplicate-check →
//! (advisory) metadata → initiate → direct-to-storage transfer → finalize,
//! emitting progress events and enforcing the pipeline's ordering
//! invariants. The finalize call is issued only after the storage target
//! has confirmed the full transfer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use campusvault_protocol::messages::{
    FinalizeUploadRequest, GenerateMetadataRequest, GenerateMetadataResponse,
    InitiateUploadRequest,
};
use campusvault_protocol::types::{
    DuplicateCheckResult, ExistingResource, FileDigest, ResourceRecord, ResourceType, SelectedFile,
    StoredBlob,
};
use campusvault_transfer::TransferTracker;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, BlobStore, TransferTick};
use crate::dedup;
use crate::error::{ErrorKind, UploadError};
use crate::picker::{self, FilePicker, PickError, PickOutcome};
use crate::session::{FailedStage, Phase, SessionSnapshot, UploadSession};

/// Tunables for the pipeline.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Files larger than this are rejected before hashing.
    pub max_file_size: u64,
    /// Chunk size for hashing (0 means the transfer crate default).
    pub chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: picker::MAX_FILE_SIZE,
            chunk_size: campusvault_transfer::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// User decision when a duplicate blocks the upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// Navigate to the existing resource; the session stays blocked.
    ViewExisting,
    /// Abandon the upload; the session resets to a clean Selection state.
    CancelUpload,
}

/// Events observed by the presentation layer.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    PhaseChanged {
        phase: Phase,
    },
    Progress {
        phase: Phase,
        fraction: f64,
    },
    TransferStats {
        speed_label: Option<String>,
        eta_label: Option<String>,
    },
    /// A duplicate was found; the pipeline is blocked on user acknowledgment.
    DuplicateFound {
        result: DuplicateCheckResult,
    },
    /// Advisory metadata arrived. `applied` is true if any empty field was
    /// filled.
    MetadataSuggested {
        suggestion: GenerateMetadataResponse,
        applied: bool,
    },
    Completed {
        resource: ResourceRecord,
    },
    Failed {
        kind: ErrorKind,
        message: String,
    },
}

/// Sequences one upload session at a time.
///
/// All network and file I/O is asynchronous; state is observed through
/// [`SessionSnapshot`]s and the event stream. In-flight work is abandoned
/// (not corrupted) by newer operations: each mutation is checked against
/// the session generation, and each operation holds a cancellation token
/// that the next operation cancels.
pub struct UploadOrchestrator {
    backend: Arc<dyn BackendClient>,
    store: Arc<dyn BlobStore>,
    config: UploadConfig,
    session: Arc<UploadSession>,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    op_cancel: Mutex<CancellationToken>,
}

impl UploadOrchestrator {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        store: Arc<dyn BlobStore>,
        config: UploadConfig,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            backend,
            store,
            config,
            session: Arc::new(UploadSession::new()),
            events_tx,
            events_rx: Some(events_rx),
            op_cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Point-in-time view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Runs the platform picker and feeds the outcome into the pipeline.
    ///
    /// Picker dismissal is a quiet no-op; permission denial surfaces as
    /// [`UploadError::PermissionDenied`] with remediation guidance.
    pub async fn pick_file(&self, file_picker: &dyn FilePicker) -> Result<(), UploadError> {
        let outcome = file_picker.pick().map_err(|e| match e {
            PickError::PermissionDenied => UploadError::PermissionDenied,
            PickError::Io(io) => {
                UploadError::HashComputation(campusvault_transfer::TransferError::Io(io))
            }
        })?;
        self.select_file(outcome).await
    }

    /// Installs a picked file and, when a course unit is selected, runs the
    /// hash + duplicate check.
    ///
    /// The size gate fires before the session is touched: an oversized file
    /// never enters the pipeline and nothing is hashed.
    pub async fn select_file(&self, outcome: PickOutcome) -> Result<(), UploadError> {
        let file = match outcome {
            PickOutcome::Cancelled => return Ok(()),
            PickOutcome::Selected(file) => file,
        };
        picker::check_size(&file, self.config.max_file_size)?;

        let token = self.begin_op();
        let generation = self.session.begin_selection(file);
        self.emit(UploadEvent::PhaseChanged {
            phase: Phase::Selection,
        })
        .await;
        info!(generation, "file selected, starting duplicate check");

        self.run_check(generation, token).await
    }

    /// Removes the picked file and resets the session.
    pub async fn clear_file(&self) {
        self.begin_op();
        self.session.reset();
        self.emit(UploadEvent::PhaseChanged {
            phase: Phase::Selection,
        })
        .await;
    }

    /// Abandons in-flight work without losing the file, digest, or any
    /// user-entered metadata. Not an error; no Failed event is emitted.
    pub async fn cancel(&self) {
        self.begin_op();
        let generation = self.session.generation();
        self.session.set_transfer_labels(generation, None, None);
        if self.session.set_phase(generation, Phase::Selection) {
            self.emit(UploadEvent::PhaseChanged {
                phase: Phase::Selection,
            })
            .await;
        }
    }

    // -----------------------------------------------------------------------
    // Metadata fields
    // -----------------------------------------------------------------------

    pub fn set_title(&self, title: impl Into<String>) {
        self.session.set_title(title);
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.session.set_description(description);
    }

    pub fn set_resource_type(&self, resource_type: ResourceType) {
        self.session.set_resource_type(resource_type);
    }

    /// Rescopes the session to a different course unit.
    ///
    /// Any in-flight duplicate check is cancelled and a new one starts
    /// immediately, reusing the cached digest (the file is not re-hashed).
    pub async fn on_course_unit_changed(
        &self,
        course_unit_id: i64,
        course_unit_name: &str,
    ) -> Result<(), UploadError> {
        let token = self.begin_op();
        let generation = self.session.set_course_unit(course_unit_id, course_unit_name);
        debug!(course_unit_id, "course unit changed");

        if self.session.snapshot().file.is_some() {
            self.run_check(generation, token).await
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Duplicate acknowledgment
    // -----------------------------------------------------------------------

    /// Resolves a standing duplicate.
    ///
    /// Returns the existing resource for `ViewExisting` so the caller can
    /// navigate to it. A duplicate is never silently uploaded: the only way
    /// forward is abandoning this upload or leaving the screen.
    pub async fn acknowledge_duplicate(
        &self,
        decision: DuplicateDecision,
    ) -> Option<ExistingResource> {
        let existing = self
            .snapshot()
            .duplicate
            .as_ref()
            .and_then(|d| d.existing.clone());

        match decision {
            DuplicateDecision::ViewExisting => existing,
            DuplicateDecision::CancelUpload => {
                self.begin_op();
                self.session.reset();
                self.emit(UploadEvent::PhaseChanged {
                    phase: Phase::Selection,
                })
                .await;
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Submission & retry
    // -----------------------------------------------------------------------

    /// Validates and runs initiate → transfer → finalize.
    ///
    /// The guard is synchronous and makes no network call: a file, a course
    /// unit, and a non-empty title are required, and a standing duplicate
    /// must be acknowledged first. On success the session resets to a clean
    /// Selection state, ready for the next upload.
    pub async fn submit(&self) -> Result<(), UploadError> {
        let snap = self.snapshot();
        if snap.file.is_none() {
            return Err(UploadError::MissingField("file"));
        }
        if snap.course_unit_id.is_none() {
            return Err(UploadError::MissingField("course_unit_id"));
        }
        if snap.title.trim().is_empty() {
            return Err(UploadError::MissingField("title"));
        }
        if let Some(duplicate) = &snap.duplicate
            && duplicate.is_duplicate
        {
            return Err(UploadError::DuplicateFound {
                existing: duplicate.existing.clone(),
                similarity_score: duplicate.similarity_score,
            });
        }

        let token = self.begin_op();
        let generation = self.session.generation();
        self.run_upload(generation, token).await
    }

    /// Retries from a failed state, re-entering the stage that failed.
    ///
    /// - duplicate check failed → re-run the check (cached digest reused);
    /// - initiate/transfer failed → re-initiate with a fresh upload target
    ///   (the issued target is not guaranteed resumable) and re-send bytes;
    /// - finalize failed → re-issue only the finalize call, reusing the
    ///   cached `file_id`/`file_url`/digest — the blob is already stored.
    pub async fn retry(&self) -> Result<(), UploadError> {
        let snap = self.snapshot();
        let Some(stage) = snap.failed_stage else {
            warn!("retry called without a failed stage; ignoring");
            return Ok(());
        };

        let token = self.begin_op();
        let generation = self.session.generation();
        match stage {
            FailedStage::DuplicateCheck => self.run_check(generation, token).await,
            FailedStage::Upload => self.run_upload(generation, token).await,
            FailedStage::Finalize => self.run_finalize(generation, token).await,
        }
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    /// Hash + duplicate check, then advisory metadata on a clear result.
    async fn run_check(
        &self,
        generation: u64,
        token: CancellationToken,
    ) -> Result<(), UploadError> {
        let snap = self.snapshot();
        let Some(file) = snap.file else {
            return Err(UploadError::MissingField("file"));
        };
        // Without a course-unit scope there is nothing to check against yet;
        // the check runs when the unit is chosen.
        let Some(course_unit_id) = snap.course_unit_id else {
            return Ok(());
        };

        self.transition(generation, Phase::Hashing).await;

        let (progress_tx, mut progress_rx) = mpsc::channel::<f64>(32);
        let forwarder = {
            let session = Arc::clone(&self.session);
            let events = self.events_tx.clone();
            tokio::spawn(async move {
                let mut in_check = false;
                while let Some(weighted) = progress_rx.recv().await {
                    if !session.is_current(generation) {
                        continue;
                    }
                    // Weighted fractions: hash occupies 0–50%, the backend
                    // round-trip 50–100%.
                    let (phase, fraction) = if weighted < 0.5 {
                        (Phase::Hashing, weighted * 2.0)
                    } else {
                        if !in_check {
                            in_check = true;
                            if session.set_phase(generation, Phase::DuplicateCheck) {
                                let _ = events
                                    .send(UploadEvent::PhaseChanged {
                                        phase: Phase::DuplicateCheck,
                                    })
                                    .await;
                            }
                        }
                        (Phase::DuplicateCheck, (weighted - 0.5) * 2.0)
                    };
                    session.set_progress(generation, fraction);
                    let _ = events.send(UploadEvent::Progress { phase, fraction }).await;
                }
            })
        };

        let check = dedup::check_duplicate(
            self.backend.as_ref(),
            course_unit_id,
            &file,
            snap.digest,
            self.config.chunk_size,
            progress_tx,
        );
        let result = tokio::select! {
            result = check => result,
            _ = token.cancelled() => Err(UploadError::Cancelled),
        };
        let _ = forwarder.await;

        match result {
            Err(UploadError::Cancelled) => Ok(()),
            Err(err) => self.fail(generation, err, FailedStage::DuplicateCheck).await,
            Ok((digest, verdict)) => {
                if !self.session.set_digest(generation, digest) {
                    // A newer selection owns the session.
                    return Ok(());
                }
                self.session.set_duplicate(generation, verdict.clone());

                if verdict.is_duplicate {
                    info!(course_unit_id, "duplicate found, blocking upload");
                    self.emit(UploadEvent::DuplicateFound { result: verdict }).await;
                    Ok(())
                } else {
                    self.autofill_metadata(generation, token, &file).await;
                    Ok(())
                }
            }
        }
    }

    /// Advisory metadata generation. Never fails the pipeline.
    async fn autofill_metadata(&self, generation: u64, token: CancellationToken, file: &SelectedFile) {
        self.transition(generation, Phase::Metadata).await;

        let snap = self.snapshot();
        let request = GenerateMetadataRequest {
            filename: file.name.clone(),
            course_unit_name: snap.course_unit_name,
            resource_type: snap.resource_type,
        };

        let response = tokio::select! {
            response = self.backend.generate_metadata(request) => response,
            _ = token.cancelled() => return,
        };

        match response {
            Ok(suggestion) => {
                // Only fields still empty at resolution time are filled;
                // anything the user typed meanwhile stays untouched.
                let applied = self.session.apply_metadata_suggestion(generation, &suggestion);
                self.emit(UploadEvent::MetadataSuggested {
                    suggestion,
                    applied,
                })
                .await;
            }
            Err(e) => {
                warn!(error = %e, "metadata generation failed; continuing without suggestions");
            }
        }
    }

    /// Initiate + direct-to-storage transfer, then finalize.
    async fn run_upload(
        &self,
        generation: u64,
        token: CancellationToken,
    ) -> Result<(), UploadError> {
        let snap = self.snapshot();
        let Some(file) = snap.file else {
            return Err(UploadError::MissingField("file"));
        };
        let Some(course_unit_id) = snap.course_unit_id else {
            return Err(UploadError::MissingField("course_unit_id"));
        };

        // Initiating: obtain a one-time upload target. Failure here is
        // retryable and does not consume the cached digest.
        if !self.transition(generation, Phase::Initiating).await {
            return Ok(());
        }
        let initiate = self.backend.initiate_upload(InitiateUploadRequest {
            course_unit_id,
            filename: file.name.clone(),
            content_type: file.mime_type.clone(),
            size_bytes: file.size_bytes,
        });
        let initiated = tokio::select! {
            response = initiate => response.map_err(UploadError::from_api),
            _ = token.cancelled() => Err(UploadError::Cancelled),
        };
        let target = match initiated {
            Ok(target) => target,
            Err(UploadError::Cancelled) => return Ok(()),
            Err(err) => return self.fail(generation, err, FailedStage::Upload).await,
        };

        // Transferring: stream the bytes straight to storage, annotating
        // each tick with speed/ETA.
        if !self.transition(generation, Phase::Transferring).await {
            return Ok(());
        }
        let (tick_tx, mut tick_rx) = mpsc::channel::<TransferTick>(64);
        let forwarder = {
            let session = Arc::clone(&self.session);
            let events = self.events_tx.clone();
            tokio::spawn(async move {
                let mut tracker = TransferTracker::new();
                let started = Instant::now();
                while let Some(tick) = tick_rx.recv().await {
                    if !session.is_current(generation) {
                        continue;
                    }
                    let stats = tracker.update(
                        tick.bytes_loaded,
                        tick.bytes_total,
                        started.elapsed().as_millis() as u64,
                    );
                    session.set_progress(generation, stats.fraction);
                    session.set_transfer_labels(
                        generation,
                        stats.speed_label.clone(),
                        stats.eta_label.clone(),
                    );
                    let _ = events
                        .send(UploadEvent::Progress {
                            phase: Phase::Transferring,
                            fraction: stats.fraction,
                        })
                        .await;
                    let _ = events
                        .send(UploadEvent::TransferStats {
                            speed_label: stats.speed_label,
                            eta_label: stats.eta_label,
                        })
                        .await;
                }
            })
        };

        let put = self
            .store
            .put(target.upload_url, file.clone(), tick_tx, token.clone());
        let stored = tokio::select! {
            result = put => result,
            _ = token.cancelled() => Err(crate::error::ApiError::Network("cancelled".into())),
        };
        let _ = forwarder.await;

        if token.is_cancelled() {
            return Ok(());
        }
        let stored = match stored {
            Ok(blob) => blob,
            Err(e) => {
                // The digest and file stay cached for retry; only the bytes
                // need re-sending, against a fresh target.
                let err = UploadError::TransferInterrupted(e.to_string());
                return self.fail(generation, err, FailedStage::Upload).await;
            }
        };
        if !self.session.set_stored(generation, stored) {
            return Ok(());
        }

        self.run_finalize(generation, token).await
    }

    /// Commits the resource record. Only reachable after the storage target
    /// confirmed the transfer.
    async fn run_finalize(
        &self,
        generation: u64,
        token: CancellationToken,
    ) -> Result<(), UploadError> {
        let snap = self.snapshot();
        let Some(file) = snap.file else {
            return Err(UploadError::MissingField("file"));
        };
        let Some(course_unit_id) = snap.course_unit_id else {
            return Err(UploadError::MissingField("course_unit_id"));
        };
        let Some(stored) = snap.stored else {
            return Err(UploadError::MissingField("stored_blob"));
        };

        if !self.transition(generation, Phase::Finalizing).await {
            return Ok(());
        }
        let digest = match self.ensure_digest(generation, &file).await {
            Ok(digest) => digest,
            Err(err) => return self.fail(generation, err, FailedStage::Finalize).await,
        };

        let request = FinalizeUploadRequest {
            course_unit_id,
            file_id: stored.file_id.clone(),
            file_url: stored.file_url.clone(),
            filename: file.name.clone(),
            content_type: file.mime_type.clone(),
            size_bytes: file.size_bytes,
            sha256: digest.hex.clone(),
            title: snap.title.clone(),
            description: snap.description.clone(),
            resource_type: snap.resource_type,
        };
        let finalize = self.backend.finalize_upload(request);
        let result = tokio::select! {
            response = finalize => response,
            _ = token.cancelled() => return Ok(()),
        };

        match result {
            Ok(resource) => {
                self.transition(generation, Phase::Succeeded).await;
                info!(resource_id = resource.id, "upload finalized");
                self.emit(UploadEvent::Completed { resource }).await;

                // A successful upload clears the whole session; stale state
                // can never be re-submitted.
                self.session.reset();
                self.emit(UploadEvent::PhaseChanged {
                    phase: Phase::Selection,
                })
                .await;
                Ok(())
            }
            Err(e) => {
                // Orphaned upload: the blob exists but no record was created.
                // file_id/file_url/digest stay cached so retry finalizes
                // without re-transferring bytes.
                let err = UploadError::FinalizeFailed(e.to_string());
                self.fail(generation, err, FailedStage::Finalize).await
            }
        }
    }

    /// Returns the cached digest, hashing the file only if no digest is
    /// known for this session.
    async fn ensure_digest(
        &self,
        generation: u64,
        file: &SelectedFile,
    ) -> Result<FileDigest, UploadError> {
        if let Some(digest) = self.snapshot().digest {
            return Ok(digest);
        }

        let path = PathBuf::from(&file.uri);
        let chunk_size = self.config.chunk_size;
        let digest =
            tokio::task::spawn_blocking(move || {
                campusvault_transfer::hash_file(&path, chunk_size, &mut |_| {})
            })
            .await
            .map_err(|e| {
                UploadError::HashComputation(campusvault_transfer::TransferError::Io(
                    std::io::Error::other(format!("hash task join error: {e}")),
                ))
            })??;
        self.session.set_digest(generation, digest.clone());
        Ok(digest)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Cancels the previous operation's token and installs a fresh one.
    fn begin_op(&self) -> CancellationToken {
        let mut guard = self.op_cancel.lock().unwrap();
        guard.cancel();
        let token = CancellationToken::new();
        *guard = token.clone();
        token
    }

    async fn emit(&self, event: UploadEvent) {
        let _ = self.events_tx.send(event).await;
    }

    /// Generation-guarded phase transition with event emission.
    async fn transition(&self, generation: u64, phase: Phase) -> bool {
        if self.session.set_phase(generation, phase) {
            self.emit(UploadEvent::PhaseChanged { phase }).await;
            true
        } else {
            false
        }
    }

    async fn fail(
        &self,
        generation: u64,
        err: UploadError,
        stage: FailedStage,
    ) -> Result<(), UploadError> {
        if self.session.fail(generation, err.kind(), stage) {
            self.emit(UploadEvent::PhaseChanged {
                phase: Phase::Failed,
            })
            .await;
            self.emit(UploadEvent::Failed {
                kind: err.kind(),
                message: err.to_string(),
            })
            .await;
        }
        Err(err)
    }
}
