//! Extraction handler.
//!
//! Serves one archive entry per request:
//!
//! 1. resolve the archive and entry names for the request
//! 2. reject methods other than GET and HEAD
//! 3. open the archive, stat the entry, allocate a buffer of its size
//! 4. open the entry stream and read it completely
//! 5. release the stream and archive, then build the response
//!
//! Each failure maps to one status and no status line or header is produced
//! before the whole entry is in memory. Archive handles and entry streams are
//! owned values, so every early return releases them.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{Response, StatusCode};
use http_body_util::Full;
use tracing::{debug, error, warn};

use crate::archive::{ArchiveBackend, ArchiveHandle, read_full};
use crate::error::{ExtractError, HandlerError};
use crate::request::RequestInfo;
use crate::resolver::{ConfigResolver, ResolvedPaths};

/// Content type used when the entry name gives no hint
pub const FALLBACK_CONTENT_TYPE: &str = "text/plain";

/// Default cap on the decompressed size of a served entry
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 256 * 1024 * 1024;

/// Decompressed bytes of one entry, owned by the request
#[derive(Debug)]
pub struct ExtractedContent {
    pub bytes: Vec<u8>,
}

impl ExtractedContent {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Request handler bound to one route's resolver and an archive backend.
pub struct ExtractionHandler<R, B> {
    resolver: R,
    backend: B,
    max_entry_size: u64,
}

impl<R: ConfigResolver, B: ArchiveBackend> ExtractionHandler<R, B> {
    pub fn new(resolver: R, backend: B) -> Self {
        Self {
            resolver,
            backend,
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
        }
    }

    pub fn with_max_entry_size(mut self, max_entry_size: u64) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Handle a request.
    ///
    /// Returns `Err` only when the configured values cannot be resolved; the
    /// caller must then abort the request without sending anything.
    pub async fn handle(&self, req: &RequestInfo) -> Result<Response<Full<Bytes>>, HandlerError> {
        let paths = self.resolver.resolve(req).map_err(|e| {
            error!(uri = %req.uri, error = %e, "Failed to read archive configuration settings");
            e
        })?;

        if !req.is_retrieval() {
            warn!(method = %req.method, uri = %req.uri, "Only GET and HEAD requests are supported");
            return status_response(ExtractError::MethodNotAllowed);
        }

        match self.extract(&paths).await {
            Ok(content) => content_response(req, &paths, content),
            Err(e) => status_response(e),
        }
    }

    /// Run the archive side of the request and return the entry's bytes.
    pub async fn extract(&self, paths: &ResolvedPaths) -> Result<ExtractedContent, ExtractError> {
        let archive_path = paths.archive_path.as_str();
        let entry_path = paths.entry_path.as_str();

        let archive = self.backend.open(archive_path).await.map_err(|e| {
            error!(archive = archive_path, error = %e, "No such archive file");
            ExtractError::NotFound
        })?;

        let stat = archive.stat(entry_path).await.map_err(|e| {
            error!(archive = archive_path, entry = entry_path, error = %e, "No such file inside archive");
            ExtractError::NotFound
        })?;

        let mut bytes = allocate(stat.size, self.max_entry_size).ok_or_else(|| {
            error!(
                archive = archive_path,
                entry = entry_path,
                size = stat.size,
                limit = self.max_entry_size,
                "Failed to allocate response buffer"
            );
            ExtractError::Internal
        })?;

        // Presence was confirmed by stat, so failing here means a broken archive
        let mut stream = archive.open_entry(entry_path).await.map_err(|e| {
            error!(archive = archive_path, entry = entry_path, error = %e, "Failed to open entry (corrupted?)");
            ExtractError::Internal
        })?;

        let read = read_full(&mut stream, &mut bytes).await.map_err(|e| {
            error!(archive = archive_path, entry = entry_path, error = %e, "Failed to read entry (corrupted?)");
            ExtractError::Internal
        })?;

        if read as u64 != stat.size {
            error!(
                archive = archive_path,
                entry = entry_path,
                expected = stat.size,
                read,
                "Couldn't get all bytes of entry (corrupted?)"
            );
            return Err(ExtractError::Internal);
        }

        drop(stream);
        drop(archive);

        debug!(
            archive = archive_path,
            entry = entry_path,
            size = read,
            method = %stat.method,
            "Extracted entry"
        );
        Ok(ExtractedContent { bytes })
    }
}

/// Allocate a zeroed buffer of exactly `size` bytes without aborting on failure
fn allocate(size: u64, limit: u64) -> Option<Vec<u8>> {
    if size > limit {
        return None;
    }
    let len = usize::try_from(size).ok()?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).ok()?;
    buf.resize(len, 0);
    Some(buf)
}

/// Content type for an entry, from its extension
pub fn content_type_for(entry_path: &str) -> &'static str {
    mime_guess::from_path(entry_path)
        .first_raw()
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

fn content_response(
    req: &RequestInfo,
    paths: &ResolvedPaths,
    content: ExtractedContent,
) -> Result<Response<Full<Bytes>>, HandlerError> {
    let length = content.len();
    let body = if req.is_head() {
        Bytes::new()
    } else {
        Bytes::from(content.bytes)
    };

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type_for(&paths.entry_path))
        .header(CONTENT_LENGTH, length)
        .body(Full::new(body))?)
}

fn status_response(err: ExtractError) -> Result<Response<Full<Bytes>>, HandlerError> {
    Ok(Response::builder()
        .status(err.to_http_status())
        .header(CONTENT_LENGTH, 0)
        .body(Full::new(Bytes::new()))?)
}
