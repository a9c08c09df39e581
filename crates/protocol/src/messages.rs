use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::{ProcessingState, UploadMetadata};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Starts a new upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadRequest {
    pub filename: String,
    pub mime_type: String,
    pub total_size: u64,
    pub chunk_size: u64,
    #[serde(flatten)]
    pub metadata: UploadMetadata,
}

/// JSON part accompanying the binary chunk in the multipart upload body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkManifest {
    pub upload_id: String,
    pub chunk_number: u32,
    /// Byte length of this chunk (the final chunk may be short).
    pub chunk_size: u64,
    /// Hex digest of the chunk bytes, verified server-side.
    pub checksum: String,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Response to session initiation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiateUploadResponse {
    pub upload_id: String,
}

/// Authoritative server-side view of an upload session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadStatusResponse {
    pub upload_id: String,
    pub total_chunks: u32,
    pub uploaded_chunks: u32,
    pub progress_percentage: f64,
    /// Chunk indices the server has not acknowledged, ascending.
    #[serde(default)]
    pub missing_chunks: Vec<u32>,
}

/// Response to upload completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadResponse {
    pub movie_id: String,
    pub status: ProcessingState,
}

/// Processing status of a completed upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatusResponse {
    pub movie_id: String,
    pub status: ProcessingState,
    /// Derived quality renditions, keyed by quality label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualities: Option<HashMap<String, String>>,
}

/// Full movie resource info, fetched once processing is done.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieInfo {
    pub movie_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub status: ProcessingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualities: Option<HashMap<String, String>>,
}
