use serde::{Deserialize, Serialize};

use crate::types::{ExistingResource, ResourceType};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Asks whether a resource with this digest already exists for a course unit.
///
/// `POST /resources/duplicate-check`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckRequest {
    pub course_unit_id: i64,
    pub sha256: String,
    pub filename: String,
    pub size_bytes: u64,
}

/// Requests AI-assisted metadata suggestions for a file.
///
/// `POST /resources/metadata/generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateMetadataRequest {
    pub filename: String,
    pub course_unit_name: String,
    pub resource_type: ResourceType,
}

/// Requests a one-time direct-upload target from the backend.
///
/// `POST /uploads/initiate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiateUploadRequest {
    pub course_unit_id: i64,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}

/// Commits the resource record after the blob is confirmed stored.
///
/// `POST /uploads/finalize` — must only be sent after the storage target
/// acknowledged the full transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizeUploadRequest {
    pub course_unit_id: i64,
    pub file_id: String,
    pub file_url: String,
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub resource_type: ResourceType,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Backend verdict on a duplicate check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateCheckResponse {
    pub duplicate: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing: Option<ExistingResource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    /// Echo of the queried digest, when the backend includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Advisory metadata suggestions. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateMetadataResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// One-time upload target for the direct-to-storage transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiateUploadResponse {
    pub upload_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_check_request_field_names() {
        let req = DuplicateCheckRequest {
            course_unit_id: 5,
            sha256: "ab".repeat(32),
            filename: "lecture7.pdf".into(),
            size_bytes: 1024,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["course_unit_id"], 5);
        assert_eq!(json["filename"], "lecture7.pdf");
        assert_eq!(json["size_bytes"], 1024);
    }

    #[test]
    fn duplicate_check_response_minimal_body() {
        // A clear result is just `{"duplicate": false}` on the wire.
        let resp: DuplicateCheckResponse =
            serde_json::from_str(r#"{"duplicate":false}"#).unwrap();
        assert!(!resp.duplicate);
        assert!(resp.existing.is_none());
        assert!(resp.similarity_score.is_none());
    }

    #[test]
    fn metadata_response_all_fields_optional() {
        let resp: GenerateMetadataResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp, GenerateMetadataResponse::default());
    }

    #[test]
    fn finalize_request_omits_empty_description() {
        let req = FinalizeUploadRequest {
            course_unit_id: 5,
            file_id: "f-1".into(),
            file_url: "https://cdn.example.com/f-1".into(),
            filename: "lecture7.pdf".into(),
            content_type: "application/pdf".into(),
            size_bytes: 1024,
            sha256: "ab".repeat(32),
            title: "Lecture 7".into(),
            description: String::new(),
            resource_type: ResourceType::Notes,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("description"));
        assert!(json.contains("\"resource_type\":\"notes\""));
    }
}
