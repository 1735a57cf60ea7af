//! Wire types for the CampusVault backend REST contract.
//!
//! Request/response shapes for the upload pipeline endpoints
//! (duplicate-check, metadata generation, initiate, finalize) plus the
//! shared data model (`SelectedFile`, `FileDigest`, resource descriptors).
//! All JSON field names match the backend contract exactly (snake_case).

pub mod messages;
pub mod types;

pub use messages::{
    DuplicateCheckRequest, DuplicateCheckResponse, FinalizeUploadRequest,
    GenerateMetadataRequest, GenerateMetadataResponse, InitiateUploadRequest,
    InitiateUploadResponse,
};
pub use types::{
    DigestError, DuplicateCheckResult, ExistingResource, FileDigest, ResourceRecord, ResourceType,
    SelectedFile, StoredBlob,
};
