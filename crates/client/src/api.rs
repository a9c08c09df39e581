//! Transport trait over the movie upload API.
//!
//! The upload engine drives a `dyn MovieApi` rather than a concrete
//! HTTP client, keeping session and dispatcher logic decoupled from
//! transport and testable with mocks.

use std::future::Future;
use std::pin::Pin;

use reelport_protocol::messages::{
    ChunkManifest, CompleteUploadResponse, InitiateUploadRequest, InitiateUploadResponse,
    MovieInfo, ProcessingStatusResponse, UploadStatusResponse,
};

use crate::client::{ApiClient, Error};

/// Boxed future returned by [`MovieApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Abstract movie upload transport.
pub trait MovieApi: Send + Sync {
    /// Starts a new upload session and returns the server-issued id.
    fn initiate(&self, req: InitiateUploadRequest) -> ApiFuture<'_, InitiateUploadResponse>;

    /// Uploads one checksummed chunk.
    fn upload_chunk(&self, manifest: ChunkManifest, data: Vec<u8>) -> ApiFuture<'_, ()>;

    /// Fetches the server's view of the session.
    fn upload_status(&self, upload_id: &str) -> ApiFuture<'_, UploadStatusResponse>;

    /// Finalizes the session.
    fn complete_upload(&self, upload_id: &str) -> ApiFuture<'_, CompleteUploadResponse>;

    /// Deletes the session server-side.
    fn cancel_upload(&self, upload_id: &str) -> ApiFuture<'_, ()>;

    /// Fetches post-upload processing status.
    fn processing_status(&self, movie_id: &str) -> ApiFuture<'_, ProcessingStatusResponse>;

    /// Fetches full movie resource info.
    fn movie_info(&self, movie_id: &str) -> ApiFuture<'_, MovieInfo>;
}

impl MovieApi for ApiClient {
    fn initiate(&self, req: InitiateUploadRequest) -> ApiFuture<'_, InitiateUploadResponse> {
        Box::pin(async move { ApiClient::initiate(self, &req).await })
    }

    fn upload_chunk(&self, manifest: ChunkManifest, data: Vec<u8>) -> ApiFuture<'_, ()> {
        Box::pin(async move { ApiClient::upload_chunk(self, &manifest, data).await })
    }

    fn upload_status(&self, upload_id: &str) -> ApiFuture<'_, UploadStatusResponse> {
        let upload_id = upload_id.to_string();
        Box::pin(async move { ApiClient::upload_status(self, &upload_id).await })
    }

    fn complete_upload(&self, upload_id: &str) -> ApiFuture<'_, CompleteUploadResponse> {
        let upload_id = upload_id.to_string();
        Box::pin(async move { ApiClient::complete_upload(self, &upload_id).await })
    }

    fn cancel_upload(&self, upload_id: &str) -> ApiFuture<'_, ()> {
        let upload_id = upload_id.to_string();
        Box::pin(async move { ApiClient::cancel_upload(self, &upload_id).await })
    }

    fn processing_status(&self, movie_id: &str) -> ApiFuture<'_, ProcessingStatusResponse> {
        let movie_id = movie_id.to_string();
        Box::pin(async move { ApiClient::processing_status(self, &movie_id).await })
    }

    fn movie_info(&self, movie_id: &str) -> ApiFuture<'_, MovieInfo> {
        let movie_id = movie_id.to_string();
        Box::pin(async move { ApiClient::movie_info(self, &movie_id).await })
    }
}
