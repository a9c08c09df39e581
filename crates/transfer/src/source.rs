use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use crate::TransferError;

/// A source of file bytes addressable by range.
///
/// The upload engine only ever asks for exact `[offset, offset + len)`
/// slices, so anything that can serve those — an open file, an
/// in-memory buffer, a resumable stream — can back an upload without
/// the dispatcher knowing the difference.
pub trait ChunkSource: Send + Sync {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Returns `true` if the source is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `len` bytes starting at `offset`.
    fn read_range(&self, offset: u64, len: u64) -> Result<Vec<u8>, TransferError>;
}

/// File-backed chunk source.
///
/// Holds the file behind a mutex so ranges can be read from concurrent
/// chunk uploads; each read seeks then reads exactly the requested
/// range.
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Opens `path` for range reads.
    pub fn open(path: &Path) -> Result<Self, TransferError> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl ChunkSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, offset: u64, len: u64) -> Result<Vec<u8>, TransferError> {
        if offset + len > self.len {
            return Err(TransferError::RangeOutOfBounds {
                start: offset,
                end: offset + len,
                len: self.len,
            });
        }
        let mut buf = vec![0u8; len as usize];
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// In-memory chunk source, mainly for tests and small buffers.
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl ChunkSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, offset: u64, len: u64) -> Result<Vec<u8>, TransferError> {
        let end = offset + len;
        if end > self.data.len() as u64 {
            return Err(TransferError::RangeOutOfBounds {
                start: offset,
                end,
                len: self.data.len() as u64,
            });
        }
        Ok(self.data[offset as usize..end as usize].to_vec())
    }
}
