use md5::{Digest, Md5};

/// Computes the MD5 digest of `data` and returns it hex-encoded.
///
/// The digest travels with every chunk and is verified server-side, so
/// it is recomputed from the freshly sliced bytes on every upload
/// attempt rather than cached across retries.
pub fn checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
