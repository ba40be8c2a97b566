//! ZIP implementation of the archive backend traits.

use async_trait::async_trait;
use flate2::read::DeflateDecoder;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::archive::{ArchiveBackend, ArchiveHandle, EntryStat, EntryStream};
use crate::error::ArchiveError;
use crate::io::{HttpRangeReader, LocalFileReader, ReadAt, is_http_url};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Opens ZIP archives from the local filesystem or over HTTP Range requests.
#[derive(Clone)]
pub struct ZipBackend {
    client: reqwest::Client,
}

impl ZipBackend {
    pub fn new() -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client })
    }

    /// Use an existing HTTP client for remote archives
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn open_reader(&self, path: &str) -> Result<Arc<dyn ReadAt>, ArchiveError> {
        if is_http_url(path) {
            let reader = HttpRangeReader::connect(self.client.clone(), path.to_string())
                .await
                .map_err(|e| {
                    debug!(archive = path, error = %e, "Remote archive unavailable");
                    ArchiveError::ArchiveNotFound {
                        path: path.to_string(),
                    }
                })?;
            Ok(Arc::new(reader))
        } else {
            let reader = LocalFileReader::open_blocking(PathBuf::from(path))
                .await
                .map_err(|e| {
                    debug!(archive = path, error = %e, "Archive file unavailable");
                    ArchiveError::ArchiveNotFound {
                        path: path.to_string(),
                    }
                })?;
            Ok(Arc::new(reader))
        }
    }
}

#[async_trait]
impl ArchiveBackend for ZipBackend {
    type Archive = ZipArchive;

    async fn open(&self, path: &str) -> Result<ZipArchive, ArchiveError> {
        let parser = ZipParser::new(self.open_reader(path).await?);
        let entries = parser
            .list_files()
            .await
            .map_err(|e| ArchiveError::InvalidArchive {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        debug!(archive = path, entries = entries.len(), "Opened archive");
        Ok(ZipArchive { parser, entries })
    }
}

/// An opened ZIP archive with its parsed central directory.
pub struct ZipArchive {
    parser: ZipParser,
    entries: Vec<ZipFileEntry>,
}

impl ZipArchive {
    fn find(&self, name: &str) -> Result<&ZipFileEntry, ArchiveError> {
        self.entries
            .iter()
            .find(|e| !e.is_directory && e.file_name == name)
            .ok_or_else(|| ArchiveError::EntryNotFound {
                entry: name.to_string(),
            })
    }

    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }
}

#[async_trait]
impl ArchiveHandle for ZipArchive {
    type Entry = ZipEntryReader;

    async fn stat(&self, name: &str) -> Result<EntryStat, ArchiveError> {
        let entry = self.find(name)?;
        Ok(EntryStat {
            name: entry.file_name.clone(),
            size: entry.uncompressed_size,
            compressed_size: entry.compressed_size,
            method: entry.compression_method.to_string(),
        })
    }

    async fn open_entry(&self, name: &str) -> Result<ZipEntryReader, ArchiveError> {
        let entry = self.find(name)?;
        let open_error = |message: String| ArchiveError::StreamOpen {
            entry: name.to_string(),
            message,
        };

        if entry.is_encrypted() {
            return Err(open_error("encrypted entries are not supported".to_string()));
        }
        if !entry.compression_method.is_supported() {
            return Err(open_error(format!(
                "unsupported compression method: {}",
                entry.compression_method
            )));
        }

        let data = self
            .parser
            .read_compressed(entry)
            .await
            .map_err(|e| open_error(e.to_string()))?;

        Ok(ZipEntryReader::new(entry, data))
    }
}

enum EntryDecoder {
    Stored(Cursor<Vec<u8>>),
    Deflate(DeflateDecoder<Cursor<Vec<u8>>>),
}

impl Read for EntryDecoder {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            EntryDecoder::Stored(inner) => inner.read(buf),
            EntryDecoder::Deflate(inner) => inner.read(buf),
        }
    }
}

/// Most decompressed bytes produced by one trip to the blocking pool
const INFLATE_CHUNK: usize = 1024 * 1024;

/// Decompressing reader over one entry.
///
/// Never yields more than the size recorded in the central directory. The
/// CRC-32 of the produced bytes is checked as soon as that size is reached,
/// and a mismatch is reported as a read error. DEFLATE data is inflated on
/// tokio's blocking pool, at most [`INFLATE_CHUNK`] bytes per call.
pub struct ZipEntryReader {
    name: String,
    /// Taken while a blocking inflate call owns it
    decoder: Option<EntryDecoder>,
    expected_size: u64,
    expected_crc: u32,
    produced: u64,
    hasher: crc32fast::Hasher,
}

impl ZipEntryReader {
    fn new(entry: &ZipFileEntry, data: Vec<u8>) -> Self {
        let decoder = match entry.compression_method {
            CompressionMethod::Deflate => EntryDecoder::Deflate(DeflateDecoder::new(Cursor::new(data))),
            _ => EntryDecoder::Stored(Cursor::new(data)),
        };
        Self {
            name: entry.file_name.clone(),
            decoder: Some(decoder),
            expected_size: entry.uncompressed_size,
            expected_crc: entry.crc32,
            produced: 0,
            hasher: crc32fast::Hasher::new(),
        }
    }

    fn read_error(&self, message: String) -> ArchiveError {
        ArchiveError::Read {
            entry: self.name.clone(),
            message,
        }
    }

    async fn decode(&mut self, buf: &mut [u8]) -> Result<usize, ArchiveError> {
        let mut decoder = self
            .decoder
            .take()
            .ok_or_else(|| self.read_error("decoder lost by an earlier failure".to_string()))?;

        if let EntryDecoder::Stored(inner) = &mut decoder {
            let result = inner.read(buf);
            self.decoder = Some(decoder);
            return result.map_err(|e| self.read_error(e.to_string()));
        }

        let len = buf.len().min(INFLATE_CHUNK);
        let (decoder, chunk, result) = tokio::task::spawn_blocking(move || {
            let mut chunk = vec![0u8; len];
            let result = decoder.read(&mut chunk);
            (decoder, chunk, result)
        })
        .await
        .map_err(|e| self.read_error(e.to_string()))?;
        self.decoder = Some(decoder);

        let n = result.map_err(|e| self.read_error(e.to_string()))?;
        buf[..n].copy_from_slice(&chunk[..n]);
        Ok(n)
    }
}

#[async_trait]
impl EntryStream for ZipEntryReader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ArchiveError> {
        let remaining = self.expected_size - self.produced;
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let limit = (buf.len() as u64).min(remaining) as usize;
        let n = self.decode(&mut buf[..limit]).await?;

        self.hasher.update(&buf[..n]);
        self.produced += n as u64;

        if n > 0 && self.produced == self.expected_size {
            let crc = self.hasher.clone().finalize();
            if crc != self.expected_crc {
                return Err(self.read_error(format!(
                    "CRC mismatch: expected {:08x}, got {:08x}",
                    self.expected_crc, crc
                )));
            }
        }

        Ok(n)
    }
}
