use super::ReadAt;
use anyhow::Result;
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Largest span handed to one blocking read; callers loop over short reads
const MAX_READ_CHUNK: usize = 4 * 1024 * 1024;

/// Local file reader with random access support
///
/// The file is opened read-only and closed when the last clone of the handle
/// is dropped. Reads run on tokio's blocking pool.
pub struct LocalFileReader {
    file: Arc<File>,
    size: u64,
}

impl LocalFileReader {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        if metadata.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path is a directory",
            ));
        }
        Ok(Self {
            file: Arc::new(file),
            size: metadata.len(),
        })
    }

    /// [`open`](Self::open) on the blocking pool
    pub async fn open_blocking(path: PathBuf) -> std::io::Result<Self> {
        tokio::task::spawn_blocking(move || Self::open(&path)).await?
    }
}

fn read_at(file: &File, offset: u64, buf: &mut [u8]) -> std::io::Result<usize> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::FileExt;
        file.read_at(buf, offset)
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::FileExt;
        // seek_read moves the file cursor, which nothing else relies on
        file.seek_read(buf, offset)
    }

    #[cfg(not(any(unix, windows)))]
    {
        use std::io::{Read, Seek, SeekFrom};
        let mut file = file;
        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let file = Arc::clone(&self.file);
        let len = buf.len().min(MAX_READ_CHUNK);
        let (chunk, n) = tokio::task::spawn_blocking(move || {
            let mut chunk = vec![0u8; len];
            read_at(&file, offset, &mut chunk).map(|n| (chunk, n))
        })
        .await??;

        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
