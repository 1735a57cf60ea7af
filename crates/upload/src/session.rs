//! Upload session state.
//!
//! One logical session per screen instance. The session is thread-safe and
//! carries a generation counter: every fresh file selection (or course-unit
//! change) bumps the generation, and mutations from in-flight work are
//! applied only if their generation is still current — stale progress
//! callbacks from an abandoned operation are dropped, never merged.

use std::sync::RwLock;

use campusvault_protocol::types::{
    DuplicateCheckResult, FileDigest, ResourceType, SelectedFile, StoredBlob,
};
use tracing::debug;
use uuid::Uuid;

use crate::error::ErrorKind;

/// Pipeline phase. Transitions are forward-monotonic except explicit
/// restart (new file pick) or retry-from-failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Selection,
    Hashing,
    DuplicateCheck,
    Metadata,
    Initiating,
    Transferring,
    Finalizing,
    Succeeded,
    Failed,
}

/// Which stage failed, so retry re-enters the right place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    /// Hash or duplicate-check failed; retry re-runs the check.
    DuplicateCheck,
    /// Initiate or transfer failed; retry re-initiates (fresh upload target,
    /// cached digest reused).
    Upload,
    /// Transfer succeeded but the resource record was never created (an
    /// orphaned upload); retry re-issues only the finalize call.
    Finalize,
}

/// Point-in-time copy of the session for the presentation layer.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub phase: Phase,
    /// Progress of the active phase in `[0, 1]`.
    pub progress: f64,
    pub file: Option<SelectedFile>,
    pub digest: Option<FileDigest>,
    pub course_unit_id: Option<i64>,
    pub course_unit_name: String,
    pub title: String,
    pub description: String,
    pub resource_type: ResourceType,
    pub duplicate: Option<DuplicateCheckResult>,
    /// Cached once the storage target confirms the transfer; survives a
    /// finalize failure so retry never re-sends bytes.
    pub stored: Option<StoredBlob>,
    pub speed_label: Option<String>,
    pub eta_label: Option<String>,
    pub last_error: Option<ErrorKind>,
    pub failed_stage: Option<FailedStage>,
}

/// Thread-safe working state for one upload attempt.
pub struct UploadSession {
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    generation: u64,
    file: Option<SelectedFile>,
    digest: Option<FileDigest>,
    course_unit_id: Option<i64>,
    course_unit_name: String,
    title: String,
    description: String,
    resource_type: ResourceType,
    phase: Phase,
    progress: f64,
    duplicate: Option<DuplicateCheckResult>,
    stored: Option<StoredBlob>,
    speed_label: Option<String>,
    eta_label: Option<String>,
    last_error: Option<ErrorKind>,
    failed_stage: Option<FailedStage>,
}

impl SessionInner {
    fn fresh(generation: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            generation,
            file: None,
            digest: None,
            course_unit_id: None,
            course_unit_name: String::new(),
            title: String::new(),
            description: String::new(),
            resource_type: ResourceType::default(),
            phase: Phase::Selection,
            progress: 0.0,
            duplicate: None,
            stored: None,
            speed_label: None,
            eta_label: None,
            last_error: None,
            failed_stage: None,
        }
    }
}

impl Default for UploadSession {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadSession {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(SessionInner::fresh(0)),
        }
    }

    /// Current generation. Work started against an older generation must
    /// not mutate the session.
    pub fn generation(&self) -> u64 {
        self.inner.read().unwrap().generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.inner.read().unwrap().generation == generation
    }

    /// Installs a newly picked file and starts a fresh attempt.
    ///
    /// File-derived state (digest, duplicate verdict, stored blob, errors)
    /// is cleared; the course-unit selection and any metadata the user
    /// already typed are kept. Returns the new generation.
    pub fn begin_selection(&self, file: SelectedFile) -> u64 {
        let mut s = self.inner.write().unwrap();
        s.generation += 1;
        s.id = Uuid::new_v4();
        s.file = Some(file);
        s.digest = None;
        s.duplicate = None;
        s.stored = None;
        s.phase = Phase::Selection;
        s.progress = 0.0;
        s.speed_label = None;
        s.eta_label = None;
        s.last_error = None;
        s.failed_stage = None;
        s.generation
    }

    /// Clears everything back to a pristine Selection state.
    ///
    /// Used after a successful upload (prevents accidental re-submission of
    /// stale state) and when the user cancels out of a duplicate. Returns
    /// the new generation, invalidating all in-flight callbacks.
    pub fn reset(&self) -> u64 {
        let mut s = self.inner.write().unwrap();
        let generation = s.generation + 1;
        *s = SessionInner::fresh(generation);
        s.generation
    }

    /// Changes the course-unit scope.
    ///
    /// The duplicate verdict is scoped to a course unit, so it is discarded;
    /// the digest is a property of the bytes and survives. Returns the new
    /// generation (in-flight checks against the old unit become stale).
    pub fn set_course_unit(&self, id: i64, name: impl Into<String>) -> u64 {
        let mut s = self.inner.write().unwrap();
        s.generation += 1;
        s.course_unit_id = Some(id);
        s.course_unit_name = name.into();
        s.duplicate = None;
        if !matches!(s.phase, Phase::Selection | Phase::Succeeded) {
            s.phase = Phase::Selection;
            s.progress = 0.0;
        }
        s.last_error = None;
        s.failed_stage = None;
        s.generation
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.inner.write().unwrap().title = title.into();
    }

    pub fn set_description(&self, description: impl Into<String>) {
        self.inner.write().unwrap().description = description.into();
    }

    pub fn set_resource_type(&self, resource_type: ResourceType) {
        self.inner.write().unwrap().resource_type = resource_type;
    }

    // -----------------------------------------------------------------------
    // Generation-guarded mutation (returns false if the work is stale)
    // -----------------------------------------------------------------------

    pub fn set_phase(&self, generation: u64, phase: Phase) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        debug!(session = %s.id, from = ?s.phase, to = ?phase, "phase change");
        s.phase = phase;
        s.progress = 0.0;
        true
    }

    pub fn set_progress(&self, generation: u64, fraction: f64) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        s.progress = fraction;
        true
    }

    pub fn set_transfer_labels(
        &self,
        generation: u64,
        speed_label: Option<String>,
        eta_label: Option<String>,
    ) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        s.speed_label = speed_label;
        s.eta_label = eta_label;
        true
    }

    pub fn set_digest(&self, generation: u64, digest: FileDigest) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        s.digest = Some(digest);
        true
    }

    pub fn set_duplicate(&self, generation: u64, result: DuplicateCheckResult) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        s.duplicate = Some(result);
        true
    }

    pub fn set_stored(&self, generation: u64, blob: StoredBlob) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        s.stored = Some(blob);
        true
    }

    /// Marks the session failed. The file, digest, and stored blob are left
    /// intact for retry.
    pub fn fail(&self, generation: u64, kind: ErrorKind, stage: FailedStage) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        s.phase = Phase::Failed;
        s.last_error = Some(kind);
        s.failed_stage = Some(stage);
        true
    }

    /// Applies an advisory metadata suggestion to fields that are still
    /// empty. Returns `true` if anything was filled.
    pub fn apply_metadata_suggestion(
        &self,
        generation: u64,
        suggestion: &campusvault_protocol::messages::GenerateMetadataResponse,
    ) -> bool {
        let mut s = self.inner.write().unwrap();
        if s.generation != generation {
            return false;
        }
        let SessionInner {
            title, description, ..
        } = &mut *s;
        crate::metadata::apply_suggestion(title, description, suggestion)
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        let s = self.inner.read().unwrap();
        SessionSnapshot {
            id: s.id,
            phase: s.phase,
            progress: s.progress,
            file: s.file.clone(),
            digest: s.digest.clone(),
            course_unit_id: s.course_unit_id,
            course_unit_name: s.course_unit_name.clone(),
            title: s.title.clone(),
            description: s.description.clone(),
            resource_type: s.resource_type,
            duplicate: s.duplicate.clone(),
            stored: s.stored.clone(),
            speed_label: s.speed_label.clone(),
            eta_label: s.eta_label.clone(),
            last_error: s.last_error,
            failed_stage: s.failed_stage,
        }
    }

    pub fn phase(&self) -> Phase {
        self.inner.read().unwrap().phase
    }
}
