//! Chunked content hashing and transfer progress tracking.
//!
//! The hasher streams a file through SHA-256 in fixed-size chunks so large
//! files never sit whole in memory; the tracker turns raw `(bytes, time)`
//! ticks into stable human-readable speed and ETA labels.

mod hasher;
mod progress;

pub use hasher::{hash_bytes, hash_file};
pub use progress::{TransferSnapshot, TransferTracker};

/// Default chunk size for hashing and transfer: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
