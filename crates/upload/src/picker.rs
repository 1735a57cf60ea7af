//! File selection and the size gate.
//!
//! The OS document picker is an external collaborator; [`FilePicker`]
//! abstracts it so the pipeline can be driven by the mobile shell's picker
//! bridge or, in tests and CLI shells, by [`FsFilePicker`].

use std::path::{Path, PathBuf};

use campusvault_protocol::SelectedFile;

use crate::error::UploadError;

/// Maximum accepted file size: 50 MiB. Violations are rejected before
/// hashing begins.
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Result of a pick. Dismissing the picker is a normal outcome, not an
/// error — it must never surface as an error toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    Selected(SelectedFile),
    Cancelled,
}

/// Errors raised by the picker itself.
#[derive(Debug, thiserror::Error)]
pub enum PickError {
    /// Runtime storage permission was denied. Remediation: open system
    /// settings; never a silent no-op.
    #[error("storage permission denied; grant file access in system settings")]
    PermissionDenied,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Obtains a local file handle from the platform's document chooser.
pub trait FilePicker: Send + Sync {
    fn pick(&self) -> Result<PickOutcome, PickError>;
}

/// Picker backed by a known filesystem path.
///
/// Normalizes the file the way the OS bridge would: stat for the byte size,
/// extension-based MIME detection with `application/octet-stream` as the
/// fallback.
pub struct FsFilePicker {
    path: PathBuf,
}

impl FsFilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FilePicker for FsFilePicker {
    fn pick(&self) -> Result<PickOutcome, PickError> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(PickError::PermissionDenied);
            }
            Err(e) => return Err(PickError::Io(e)),
        };

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".into());

        let mime_type = detect_mime(&name)
            .unwrap_or("application/octet-stream")
            .to_string();

        Ok(PickOutcome::Selected(SelectedFile {
            name,
            uri: self.path.to_string_lossy().into_owned(),
            mime_type,
            size_bytes: metadata.len(),
        }))
    }
}

/// Detects MIME content type from a filename extension.
///
/// Covers the document types students actually share; anything else falls
/// back to `application/octet-stream` at the call site.
pub fn detect_mime(name: &str) -> Option<&'static str> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext.as_deref() {
        Some("pdf") => Some("application/pdf"),
        Some("doc") => Some("application/msword"),
        Some("docx") => {
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
        }
        Some("ppt") => Some("application/vnd.ms-powerpoint"),
        Some("pptx") => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        Some("xls") => Some("application/vnd.ms-excel"),
        Some("xlsx") => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        Some("txt") => Some("text/plain"),
        Some("md") => Some("text/markdown"),
        Some("csv") => Some("text/csv"),
        Some("zip") => Some("application/zip"),
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        _ => None,
    }
}

/// Enforces the size gate before a file enters the pipeline.
pub fn check_size(file: &SelectedFile, max_bytes: u64) -> Result<(), UploadError> {
    if file.size_bytes > max_bytes {
        return Err(UploadError::FileTooLarge {
            size_bytes: file.size_bytes,
            max_bytes,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn fs_picker_normalizes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lecture7.pdf");
        std::fs::write(&path, vec![0u8; 1234]).unwrap();

        let picked = FsFilePicker::new(&path).pick().unwrap();
        let PickOutcome::Selected(file) = picked else {
            panic!("expected a selected file");
        };
        assert_eq!(file.name, "lecture7.pdf");
        assert_eq!(file.mime_type, "application/pdf");
        assert_eq!(file.size_bytes, 1234);
        assert_eq!(file.uri, path.to_string_lossy());
    }

    #[test]
    fn fs_picker_unknown_extension_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dataset.xyz");
        std::fs::write(&path, b"x").unwrap();

        let PickOutcome::Selected(file) = FsFilePicker::new(&path).pick().unwrap() else {
            panic!("expected a selected file");
        };
        assert_eq!(file.mime_type, "application/octet-stream");
    }

    #[test]
    fn fs_picker_missing_file_is_io_error() {
        let result = FsFilePicker::new("/nonexistent/file.pdf").pick();
        assert!(matches!(result, Err(PickError::Io(_))));
    }

    #[test]
    fn detect_mime_common_documents() {
        assert_eq!(detect_mime("a.PDF"), Some("application/pdf"));
        assert_eq!(detect_mime("slides.pptx").unwrap(),
            "application/vnd.openxmlformats-officedocument.presentationml.presentation");
        assert_eq!(detect_mime("notes.md"), Some("text/markdown"));
        assert_eq!(detect_mime("archive"), None);
    }

    #[test]
    fn size_gate_rejects_oversized() {
        let file = SelectedFile {
            name: "big.bin".into(),
            uri: "/tmp/big.bin".into(),
            mime_type: "application/octet-stream".into(),
            size_bytes: MAX_FILE_SIZE + 1,
        };
        let err = check_size(&file, MAX_FILE_SIZE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileTooLarge);
    }

    #[test]
    fn size_gate_accepts_at_limit() {
        let file = SelectedFile {
            name: "ok.bin".into(),
            uri: "/tmp/ok.bin".into(),
            mime_type: "application/octet-stream".into(),
            size_bytes: MAX_FILE_SIZE,
        };
        assert!(check_size(&file, MAX_FILE_SIZE).is_ok());
    }
}
