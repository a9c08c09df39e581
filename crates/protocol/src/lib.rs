//! Wire types for the movie chunk-upload HTTP API.
//!
//! Mirrors the `/api/movies` endpoint family: session initiation,
//! per-chunk manifests, status snapshots, completion, and the
//! post-upload processing status resource. All types serialize with
//! camelCase field names to match the server contract.

pub mod messages;
pub mod types;

pub use messages::{
    ChunkManifest, CompleteUploadResponse, InitiateUploadRequest, InitiateUploadResponse,
    MovieInfo, ProcessingStatusResponse, UploadStatusResponse,
};
pub use types::{ProcessingState, SessionProgress, UploadMetadata};
