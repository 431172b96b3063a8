// ABOUTME: Media host upload types and the nostr.build-style HTTP client
// ABOUTME: Files go up as multipart parts authorized by a signed Nostr event

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use nostr_sdk::prelude::*;
use serde::Deserialize;
use thiserror::Error;

/// Default upload endpoint of the media host.
pub const DEFAULT_UPLOAD_ENDPOINT: &str = "https://nostr.build/api/v2/upload/files";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to encode authorization event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Media host rejected the upload: {0}")]
    Rejected(String),
    #[error("Malformed media host response: {0}")]
    MalformedResponse(String),
    #[error("Upload did not return a URL for {0}")]
    MissingUrl(String),
}

/// A locally selected file queued for upload.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    /// Declared MIME type
    pub content_type: String,
    pub data: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Whether the declared type is an image subtype.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// Per-file record in the media host response.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaArtifact {
    #[serde(default)]
    pub url: Option<String>,
}

/// Successful upload output for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub url: String,
}

/// External image host that stores files against a signed authorization event.
#[async_trait]
pub trait MediaHost: Send + Sync {
    /// Unsigned authorization event the host expects with an upload request.
    fn auth_template(&self, uploader: PublicKey) -> UnsignedEvent;

    /// Submit the files with the signed authorization. One artifact per
    /// file, in input order.
    async fn upload(
        &self,
        files: &[MediaFile],
        auth: &Event,
    ) -> Result<Vec<MediaArtifact>, UploadError>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Vec<MediaArtifact>,
}

/// nostr.build-compatible upload client.
pub struct NostrBuildClient {
    http: reqwest::Client,
    endpoint: String,
}

impl NostrBuildClient {
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_UPLOAD_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for NostrBuildClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MediaHost for NostrBuildClient {
    fn auth_template(&self, uploader: PublicKey) -> UnsignedEvent {
        let tags = vec![
            Tag::custom(TagKind::custom("u"), [self.endpoint.clone()]),
            Tag::custom(TagKind::custom("method"), ["POST".to_string()]),
        ];
        UnsignedEvent::new(uploader, Timestamp::now(), Kind::HttpAuth, tags, "")
    }

    async fn upload(
        &self,
        files: &[MediaFile],
        auth: &Event,
    ) -> Result<Vec<MediaArtifact>, UploadError> {
        let auth_json = serde_json::to_string(auth)?;

        let mut form = reqwest::multipart::Form::new();
        for file in files {
            let part = reqwest::multipart::Part::bytes(file.data.clone())
                .file_name(file.name.clone())
                .mime_str(&file.content_type)?;
            form = form.part("file[]", part);
        }

        tracing::debug!(
            target: "agora_signer::upload",
            "uploading {} file(s) to {}",
            files.len(),
            self.endpoint
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Nostr {}", STANDARD.encode(auth_json)),
            )
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected(format!("{status}: {body}")));
        }

        let parsed: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        if parsed.status != "success" {
            return Err(UploadError::Rejected(
                parsed.message.unwrap_or(parsed.status),
            ));
        }
        Ok(parsed.data)
    }
}
