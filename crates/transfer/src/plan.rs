use crate::TransferError;

/// Byte range and index of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    /// 0-based chunk index.
    pub index: u32,
    /// Byte offset of the chunk start within the file.
    pub offset: u64,
    /// Length in bytes. Equal to the chunk size except possibly for
    /// the final chunk.
    pub len: u64,
}

/// Partitions a file of known size into fixed-size chunks.
///
/// Chunk `i` covers `[i * chunk_size, min((i + 1) * chunk_size, file_size))`;
/// the ranges tile `[0, file_size)` with no overlap and no gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    file_size: u64,
    chunk_size: u64,
}

impl ChunkPlan {
    /// Creates a plan. Fails if `chunk_size` is zero.
    pub fn new(file_size: u64, chunk_size: u64) -> Result<Self, TransferError> {
        if chunk_size == 0 {
            return Err(TransferError::ZeroChunkSize);
        }
        Ok(Self {
            file_size,
            chunk_size,
        })
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Configured chunk size in bytes.
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of chunks: `ceil(file_size / chunk_size)`.
    pub fn total_chunks(&self) -> u32 {
        self.file_size.div_ceil(self.chunk_size) as u32
    }

    /// Returns the spec for chunk `index`.
    pub fn chunk(&self, index: u32) -> Result<ChunkSpec, TransferError> {
        let total = self.total_chunks();
        if index >= total {
            return Err(TransferError::ChunkOutOfRange { index, total });
        }
        let offset = index as u64 * self.chunk_size;
        let end = (offset + self.chunk_size).min(self.file_size);
        Ok(ChunkSpec {
            index,
            offset,
            len: end - offset,
        })
    }

    /// Iterates over all chunk specs in ascending index order.
    pub fn chunks(&self) -> impl Iterator<Item = ChunkSpec> + '_ {
        (0..self.total_chunks()).map(|i| {
            let offset = i as u64 * self.chunk_size;
            let end = (offset + self.chunk_size).min(self.file_size);
            ChunkSpec {
                index: i,
                offset,
                len: end - offset,
            }
        })
    }
}
