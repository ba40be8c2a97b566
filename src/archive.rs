//! Archive backend abstraction.
//!
//! The extraction handler only talks to archives through these traits. An
//! implementation owns whatever OS resources it needs inside the returned
//! handle and stream values; dropping them releases those resources, so the
//! handler never has to call an explicit close on an error path.

use async_trait::async_trait;

use crate::error::ArchiveError;

/// Metadata of an entry obtained before reading it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStat {
    pub name: String,
    /// Decompressed size in bytes
    pub size: u64,
    pub compressed_size: u64,
    /// Compression method name, for logging
    pub method: String,
}

/// Opens archives by path.
#[async_trait]
pub trait ArchiveBackend: Send + Sync {
    type Archive: ArchiveHandle;

    /// Open the archive at `path` read-only
    async fn open(&self, path: &str) -> Result<Self::Archive, ArchiveError>;
}

/// An opened archive.
#[async_trait]
pub trait ArchiveHandle: Send + Sync {
    type Entry: EntryStream;

    /// Look up an entry by its exact name
    async fn stat(&self, name: &str) -> Result<EntryStat, ArchiveError>;

    /// Open a decompressing read stream for an entry
    async fn open_entry(&self, name: &str) -> Result<Self::Entry, ArchiveError>;
}

/// Sequential reader over an entry's decompressed bytes.
#[async_trait]
pub trait EntryStream: Send {
    /// Read up to `buf.len()` bytes, returning 0 at the end of the entry
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ArchiveError>;
}

/// Read from `stream` until `buf` is full or the stream is exhausted.
///
/// Returns the number of bytes placed in `buf`; anything less than
/// `buf.len()` means the entry ended early.
pub async fn read_full<S: EntryStream + ?Sized>(
    stream: &mut S,
    buf: &mut [u8],
) -> Result<usize, ArchiveError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = stream.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
