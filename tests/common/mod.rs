//! Shared helpers for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Response, Uri};
use http_body_util::{BodyExt, Full};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};

use zipserve::{
    ArchiveBackend, ArchiveError, ArchiveHandle, ConfigError, ConfigResolver, EntryStat,
    EntryStream, RequestInfo, ResolvedPaths,
};

#[path = "../../src/zip/archive_builder.rs"]
mod archive_builder;

pub use archive_builder::{ArchiveBuilder, Zip64Extra};

pub fn request(method: Method, uri: &str) -> RequestInfo {
    RequestInfo::new(method, uri.parse::<Uri>().unwrap())
}

pub async fn body_bytes(resp: Response<Full<Bytes>>) -> Bytes {
    resp.into_body().collect().await.unwrap().to_bytes()
}

/// Resolver returning fixed values, or failing when built with `failing`
pub struct FixedResolver {
    paths: Option<ResolvedPaths>,
}

impl FixedResolver {
    pub fn new(archive: &str, entry: &str) -> Self {
        Self {
            paths: Some(ResolvedPaths {
                archive_path: archive.to_string(),
                entry_path: entry.to_string(),
            }),
        }
    }

    pub fn failing() -> Self {
        Self { paths: None }
    }
}

impl ConfigResolver for FixedResolver {
    fn resolve(&self, _req: &RequestInfo) -> Result<ResolvedPaths, ConfigError> {
        self.paths.clone().ok_or(ConfigError::EmptyValue {
            template: "$arg_file".to_string(),
        })
    }
}

/// Acquire/release counts recorded by [`SpyBackend`]
#[derive(Default)]
pub struct Counters {
    pub archive_opens: AtomicUsize,
    pub stats: AtomicUsize,
    pub stream_opens: AtomicUsize,
    pub live_archives: AtomicIsize,
    pub live_streams: AtomicIsize,
}

impl Counters {
    pub fn archive_opens(&self) -> usize {
        self.archive_opens.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> usize {
        self.stats.load(Ordering::SeqCst)
    }

    pub fn stream_opens(&self) -> usize {
        self.stream_opens.load(Ordering::SeqCst)
    }

    /// Nothing acquired is still held
    pub fn all_released(&self) -> bool {
        self.live_archives.load(Ordering::SeqCst) == 0
            && self.live_streams.load(Ordering::SeqCst) == 0
    }
}

/// How a spy entry behaves
#[derive(Clone)]
pub struct SpyEntry {
    pub data: Vec<u8>,
    /// Size reported by stat, normally `data.len()`
    pub reported_size: u64,
    pub fail_open: bool,
    pub fail_read: bool,
}

impl SpyEntry {
    pub fn new(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
            reported_size: data.len() as u64,
            fail_open: false,
            fail_read: false,
        }
    }
}

/// In-memory backend serving a single archive and counting every
/// acquisition and release
#[derive(Clone)]
pub struct SpyBackend {
    pub archive_path: String,
    pub entries: Arc<HashMap<String, SpyEntry>>,
    pub counters: Arc<Counters>,
}

impl SpyBackend {
    pub fn new(archive_path: &str, entries: Vec<(&str, SpyEntry)>) -> Self {
        Self {
            archive_path: archive_path.to_string(),
            entries: Arc::new(
                entries
                    .into_iter()
                    .map(|(name, entry)| (name.to_string(), entry))
                    .collect(),
            ),
            counters: Arc::new(Counters::default()),
        }
    }
}

#[async_trait]
impl ArchiveBackend for SpyBackend {
    type Archive = SpyArchive;

    async fn open(&self, path: &str) -> Result<SpyArchive, ArchiveError> {
        self.counters.archive_opens.fetch_add(1, Ordering::SeqCst);
        if path != self.archive_path {
            return Err(ArchiveError::ArchiveNotFound {
                path: path.to_string(),
            });
        }
        self.counters.live_archives.fetch_add(1, Ordering::SeqCst);
        Ok(SpyArchive {
            entries: Arc::clone(&self.entries),
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct SpyArchive {
    entries: Arc<HashMap<String, SpyEntry>>,
    counters: Arc<Counters>,
}

impl Drop for SpyArchive {
    fn drop(&mut self) {
        self.counters.live_archives.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ArchiveHandle for SpyArchive {
    type Entry = SpyStream;

    async fn stat(&self, name: &str) -> Result<EntryStat, ArchiveError> {
        self.counters.stats.fetch_add(1, Ordering::SeqCst);
        let entry = self.entries.get(name).ok_or(ArchiveError::EntryNotFound {
            entry: name.to_string(),
        })?;
        Ok(EntryStat {
            name: name.to_string(),
            size: entry.reported_size,
            compressed_size: entry.data.len() as u64,
            method: "stored".to_string(),
        })
    }

    async fn open_entry(&self, name: &str) -> Result<SpyStream, ArchiveError> {
        self.counters.stream_opens.fetch_add(1, Ordering::SeqCst);
        let entry = self.entries.get(name).ok_or(ArchiveError::EntryNotFound {
            entry: name.to_string(),
        })?;
        if entry.fail_open {
            return Err(ArchiveError::StreamOpen {
                entry: name.to_string(),
                message: "unsupported compression method".to_string(),
            });
        }
        self.counters.live_streams.fetch_add(1, Ordering::SeqCst);
        Ok(SpyStream {
            name: name.to_string(),
            data: entry.data.clone(),
            position: 0,
            fail_read: entry.fail_read,
            counters: Arc::clone(&self.counters),
        })
    }
}

pub struct SpyStream {
    name: String,
    data: Vec<u8>,
    position: usize,
    fail_read: bool,
    counters: Arc<Counters>,
}

impl Drop for SpyStream {
    fn drop(&mut self) {
        self.counters.live_streams.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl EntryStream for SpyStream {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ArchiveError> {
        if self.fail_read {
            return Err(ArchiveError::Read {
                entry: self.name.clone(),
                message: "invalid deflate stream".to_string(),
            });
        }
        // Hand out small chunks so callers must loop
        let n = buf.len().min(3).min(self.data.len() - self.position);
        buf[..n].copy_from_slice(&self.data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}
