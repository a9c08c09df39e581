//! HTTP client for the `/api/movies` endpoint family.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::debug;

use reelport_protocol::messages::{
    ChunkManifest, CompleteUploadResponse, InitiateUploadRequest, InitiateUploadResponse,
    MovieInfo, ProcessingStatusResponse, UploadStatusResponse,
};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the movie API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the server-reported status code, if this is an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Movie upload API client.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Creates a client for the service at `base_url` (scheme + host).
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: format!("{}/api/movies", base_url.trim_end_matches('/')),
        })
    }

    /// Sends a request and fails on non-2xx statuses with the body text.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    /// Starts a new upload session.
    pub async fn initiate(
        &self,
        req: &InitiateUploadRequest,
    ) -> Result<InitiateUploadResponse, Error> {
        let url = format!("{}/chunk-upload/initiate", self.base_url);
        let resp = self.http.post(&url).json(req).send().await?;
        let body = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Uploads one chunk as a multipart body: the binary chunk plus a
    /// JSON manifest part carrying the checksum.
    pub async fn upload_chunk(&self, manifest: &ChunkManifest, data: Vec<u8>) -> Result<(), Error> {
        let url = format!(
            "{}/chunk-upload/{}/chunks/{}",
            self.base_url, manifest.upload_id, manifest.chunk_number
        );
        debug!(
            upload_id = %manifest.upload_id,
            chunk = manifest.chunk_number,
            bytes = data.len(),
            "uploading chunk"
        );

        let manifest_json = serde_json::to_string(manifest)?;
        let form = Form::new()
            .part(
                "chunk",
                Part::bytes(data)
                    .file_name(format!("chunk-{}", manifest.chunk_number))
                    .mime_str("application/octet-stream")?,
            )
            .part(
                "manifest",
                Part::text(manifest_json).mime_str("application/json")?,
            );

        let resp = self.http.post(&url).multipart(form).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Fetches the server's authoritative view of the session.
    pub async fn upload_status(&self, upload_id: &str) -> Result<UploadStatusResponse, Error> {
        let url = format!("{}/chunk-upload/{upload_id}/status", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let body = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Finalizes the upload session.
    pub async fn complete_upload(&self, upload_id: &str) -> Result<CompleteUploadResponse, Error> {
        let url = format!("{}/chunk-upload/{upload_id}/complete", self.base_url);
        let resp = self.http.post(&url).send().await?;
        let body = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Deletes the upload session server-side.
    pub async fn cancel_upload(&self, upload_id: &str) -> Result<(), Error> {
        let url = format!("{}/chunk-upload/{upload_id}", self.base_url);
        let resp = self.http.delete(&url).send().await?;
        Self::check(resp).await?;
        Ok(())
    }

    /// Fetches the processing status of a completed upload.
    pub async fn processing_status(
        &self,
        movie_id: &str,
    ) -> Result<ProcessingStatusResponse, Error> {
        let url = format!("{}/{movie_id}/status", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let body = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Fetches full movie resource info.
    pub async fn movie_info(&self, movie_id: &str) -> Result<MovieInfo, Error> {
        let url = format!("{}/{movie_id}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let body = Self::check(resp).await?.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
