use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user-chosen local file, normalized from the OS picker response.
///
/// The `uri` is an opaque local reference consumed by the hasher and the
/// upload pipeline; it is never persisted beyond the upload session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFile {
    /// Display filename, usually including the extension.
    pub name: String,
    /// Opaque local reference (a filesystem path on this platform).
    pub uri: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

/// Error returned when a digest string is malformed.
#[derive(Debug, thiserror::Error)]
#[error("invalid sha256 digest: {0}")]
pub struct DigestError(pub String);

/// Content-address of a file: a SHA-256 digest in lowercase hex.
///
/// The algorithm is fixed to `sha256`; the wire representation carries it
/// explicitly so the backend can reject anything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDigest {
    pub algorithm: String,
    pub hex: String,
}

impl FileDigest {
    /// Wraps a 64-char lowercase hex string as a SHA-256 digest.
    pub fn sha256(hex: impl Into<String>) -> Result<Self, DigestError> {
        let hex = hex.into();
        if hex.len() != 64 || !hex.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
        {
            return Err(DigestError(hex));
        }
        Ok(Self {
            algorithm: "sha256".into(),
            hex,
        })
    }

    /// Builds a digest from raw SHA-256 output bytes. Infallible.
    pub fn from_raw(raw: &[u8]) -> Self {
        Self {
            algorithm: "sha256".into(),
            hex: hex::encode(raw),
        }
    }
}

impl std::fmt::Display for FileDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.hex)
    }
}

/// Category of an uploaded resource. Closed set, matches the backend enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[default]
    Notes,
    PastPaper,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Notes => "notes",
            ResourceType::PastPaper => "past_paper",
        }
    }
}

/// Descriptor of a resource that already exists for a course unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingResource {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uploader_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub course_unit_code: String,
    pub created_at: DateTime<Utc>,
}

/// Definitive outcome of a duplicate check.
///
/// An absent `similarity_score` means the match (if any) was an exact digest
/// match. Error outcomes are reported separately by the caller, never as a
/// silent "not a duplicate".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckResult {
    pub is_duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<ExistingResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
}

impl DuplicateCheckResult {
    /// A clear (non-duplicate) result.
    pub fn clear() -> Self {
        Self {
            is_duplicate: false,
            existing: None,
            similarity_score: None,
        }
    }
}

/// Identifier pair returned by the storage target once all bytes are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBlob {
    pub file_id: String,
    pub file_url: String,
}

/// Created resource descriptor returned by the finalize endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: i64,
    pub course_unit_id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub resource_type: ResourceType,
    pub file_url: String,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_accepts_lowercase_hex() {
        let hex = "a".repeat(64);
        let d = FileDigest::sha256(hex.clone()).unwrap();
        assert_eq!(d.algorithm, "sha256");
        assert_eq!(d.hex, hex);
    }

    #[test]
    fn digest_rejects_wrong_length() {
        assert!(FileDigest::sha256("abc").is_err());
        assert!(FileDigest::sha256("a".repeat(65)).is_err());
    }

    #[test]
    fn digest_rejects_uppercase_and_non_hex() {
        assert!(FileDigest::sha256("A".repeat(64)).is_err());
        assert!(FileDigest::sha256("z".repeat(64)).is_err());
    }

    #[test]
    fn digest_from_raw_is_lowercase_hex() {
        let d = FileDigest::from_raw(&[0xAB; 32]);
        assert_eq!(d.hex, "ab".repeat(32));
        assert!(FileDigest::sha256(d.hex.clone()).is_ok());
    }

    #[test]
    fn resource_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResourceType::PastPaper).unwrap(),
            "\"past_paper\""
        );
        let parsed: ResourceType = serde_json::from_str("\"notes\"").unwrap();
        assert_eq!(parsed, ResourceType::Notes);
    }

    #[test]
    fn duplicate_result_omits_absent_fields() {
        let json = serde_json::to_string(&DuplicateCheckResult::clear()).unwrap();
        assert!(!json.contains("existing"));
        assert!(!json.contains("similarity_score"));
    }

    #[test]
    fn existing_resource_json_roundtrip() {
        let existing = ExistingResource {
            id: 42,
            title: "Midterm Notes".into(),
            uploader_name: "J. Okello".into(),
            course_unit_code: "CS-204".into(),
            created_at: "2026-03-01T09:30:00Z".parse().unwrap(),
        };
        let json = serde_json::to_string(&existing).unwrap();
        let parsed: ExistingResource = serde_json::from_str(&json).unwrap();
        assert_eq!(existing, parsed);
    }
}
