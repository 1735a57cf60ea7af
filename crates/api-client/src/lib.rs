//! HTTP transport for the CampusVault backend.
//!
//! Provides a reqwest-based client with Bearer auth and JSON POST helpers,
//! implementing the [`BackendClient`] seam the upload pipeline consumes,
//! plus the direct-to-storage [`BlobStore`] transfer in [`storage`].

pub mod storage;

use std::sync::RwLock;
use std::time::Duration;

use campusvault_protocol::messages::{
    DuplicateCheckRequest, DuplicateCheckResponse, FinalizeUploadRequest, GenerateMetadataRequest,
    GenerateMetadataResponse, InitiateUploadRequest, InitiateUploadResponse,
};
use campusvault_protocol::types::ResourceRecord;
use campusvault_upload::{ApiError, ApiFuture, BackendClient};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use storage::HttpBlobStore;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// HTTP client for the CampusVault REST API.
///
/// The Bearer token is settable at runtime (login happens after the client
/// is constructed); requests without a token are sent unauthenticated and
/// rejected by the backend.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        })
    }

    /// Installs the session token used for `Authorization: Bearer`.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write().unwrap() = Some(token.into());
    }

    pub fn clear_token(&self) {
        *self.token.write().unwrap() = None;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.token.read().unwrap().as_deref() {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// POST a JSON body and deserialize the JSON response.
    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.build_url(path);
        debug!(%url, "POST");

        let request = self.apply_auth(self.http.post(&url).json(body));
        let response = request.send().await.map_err(map_transport)?;
        let response = check_status(response).await?;

        response
            .json()
            .await
            .map_err(|e| ApiError::Network(format!("failed to parse response: {e}")))
    }
}

impl BackendClient for ApiClient {
    fn check_duplicate(&self, req: DuplicateCheckRequest) -> ApiFuture<'_, DuplicateCheckResponse> {
        Box::pin(async move { self.post_json("/resources/duplicate-check", &req).await })
    }

    fn generate_metadata(
        &self,
        req: GenerateMetadataRequest,
    ) -> ApiFuture<'_, GenerateMetadataResponse> {
        Box::pin(async move { self.post_json("/resources/metadata/generate", &req).await })
    }

    fn initiate_upload(&self, req: InitiateUploadRequest) -> ApiFuture<'_, InitiateUploadResponse> {
        Box::pin(async move { self.post_json("/uploads/initiate", &req).await })
    }

    fn finalize_upload(&self, req: FinalizeUploadRequest) -> ApiFuture<'_, ResourceRecord> {
        Box::pin(async move { self.post_json("/uploads/finalize", &req).await })
    }
}

/// Maps a reqwest transport failure. Timeouts are kept distinct so the UI
/// can word them differently from connection loss.
pub(crate) fn map_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(err.to_string())
    }
}

/// Turns non-2xx responses into typed errors, consuming the body as the
/// message. 4xx is a request the server understood and rejected; 5xx is a
/// server fault.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    if status.is_client_error() {
        Err(ApiError::Validation(message))
    } else {
        Err(ApiError::Server {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = ApiClient::new("https://api.campusvault.example/").unwrap();
        assert_eq!(client.base_url(), "https://api.campusvault.example");
        assert_eq!(
            client.build_url("/uploads/initiate"),
            "https://api.campusvault.example/uploads/initiate"
        );
    }

    #[test]
    fn token_is_settable_and_clearable() {
        let client = ApiClient::new("https://api.campusvault.example").unwrap();
        assert!(client.token.read().unwrap().is_none());
        client.set_token("jwt-abc");
        assert_eq!(client.token.read().unwrap().as_deref(), Some("jwt-abc"));
        client.clear_token();
        assert!(client.token.read().unwrap().is_none());
    }
}
