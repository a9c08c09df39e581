//! Transfer primitives for chunked movie uploads.
//!
//! Pure building blocks with no I/O policy: chunk arithmetic over a
//! file size ([`ChunkPlan`]), content digests ([`checksum_bytes`]),
//! and the [`ChunkSource`] byte-range abstraction that lets the upload
//! engine read from a file, an in-memory buffer, or anything else that
//! can serve `[start, end)` slices.

mod checksum;
mod plan;
mod source;

pub use checksum::checksum_bytes;
pub use plan::{ChunkPlan, ChunkSpec};
pub use source::{ChunkSource, FileSource, MemorySource};

/// Default chunk size: 5 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk index {index} out of range (total {total})")]
    ChunkOutOfRange { index: u32, total: u32 },

    #[error("byte range [{start}, {end}) exceeds source length {len}")]
    RangeOutOfBounds { start: u64, end: u64, len: u64 },

    #[error("chunk size must be non-zero")]
    ZeroChunkSize,
}
