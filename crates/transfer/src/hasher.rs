use std::io::Read;
use std::path::Path;

use campusvault_protocol::FileDigest;
use sha2::{Digest, Sha256};

use crate::{DEFAULT_CHUNK_SIZE, TransferError};

/// Computes SHA-256 of an in-memory buffer.
pub fn hash_bytes(data: &[u8]) -> FileDigest {
    let mut hasher = Sha256::new();
    hasher.update(data);
    FileDigest::from_raw(&hasher.finalize())
}

/// Streams a file through SHA-256 in fixed-size chunks.
///
/// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (1 MiB) is used. After each
/// chunk, `on_progress` receives `bytes_read / total_size`; the reported
/// fractions are non-decreasing and the final call is exactly `1.0` (an
/// empty file reports `1.0` once).
///
/// Identical bytes always yield an identical digest regardless of chunk
/// size; the digest is the dedup key.
pub fn hash_file(
    path: &Path,
    chunk_size: usize,
    on_progress: &mut dyn FnMut(f64),
) -> Result<FileDigest, TransferError> {
    let mut file = std::fs::File::open(path)?;
    let total = file.metadata()?.len();
    let chunk_size = if chunk_size == 0 {
        DEFAULT_CHUNK_SIZE
    } else {
        chunk_size
    };

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size];
    let mut read: u64 = 0;
    let mut last_reported = -1.0f64;

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        read += n as u64;

        // `total` comes from metadata and may lag a file still being
        // written; clamp so fractions never exceed 1.0.
        let fraction = if total == 0 {
            1.0
        } else {
            (read as f64 / total as f64).min(1.0)
        };
        if fraction > last_reported {
            on_progress(fraction);
            last_reported = fraction;
        }
    }

    if last_reported != 1.0 {
        on_progress(1.0);
    }

    Ok(FileDigest::from_raw(&hasher.finalize()))
}
