use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::{Client, StatusCode};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use super::ReadAt;

const MAX_ATTEMPTS: u32 = 5;
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// Check whether an archive location names a remote resource
pub fn is_http_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Random access to a remote archive through HTTP Range requests.
///
/// Every `read_at` is one or more `GET` requests for the exact byte span.
/// Connection failures and timeouts are retried with a linear backoff, any
/// other failure is returned to the caller.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
}

impl HttpRangeReader {
    /// Probe `url` with a HEAD request and build a reader for it.
    ///
    /// Fails when the resource is missing, when the origin does not advertise
    /// byte ranges, or when it does not report a length.
    pub async fn connect(client: Client, url: String) -> Result<Self> {
        let size = probe(&client, &url).await?;
        debug!(url = %url, size, "Remote archive supports range requests");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
        })
    }

    /// Payload bytes received so far
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }

    async fn fetch_range(&self, start: u64, end: u64) -> Result<Bytes> {
        let range = format!("bytes={}-{}", start, end);
        let mut attempt = 1;

        loop {
            match self.client.get(&self.url).header(RANGE, &range).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.bytes().await?;
                    return match status {
                        StatusCode::PARTIAL_CONTENT => Ok(body),
                        // Origin ignored the range and sent the whole resource
                        StatusCode::OK => {
                            let from = usize::try_from(start)?;
                            if body.len() <= from {
                                bail!("Response for {} ends before offset {}", self.url, start);
                            }
                            Ok(body.slice(from..))
                        }
                        _ => bail!("Range request {} for {} failed: {}", range, self.url, status),
                    };
                }
                Err(e) if (e.is_timeout() || e.is_connect()) && attempt < MAX_ATTEMPTS => {
                    warn!(
                        url = %self.url,
                        range = %range,
                        "Range request failed, attempt {}/{}: {}",
                        attempt, MAX_ATTEMPTS, e
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

async fn probe(client: &Client, url: &str) -> Result<u64> {
    let resp = client.head(url).send().await?;
    if !resp.status().is_success() {
        bail!("HEAD {} returned {}", url, resp.status());
    }

    let headers = resp.headers();
    let ranges = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");
    if !ranges.split(',').any(|unit| unit.trim() == "bytes") {
        bail!("{} does not accept byte ranges", url);
    }

    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow!("{} did not report its length", url))
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = (offset + buf.len() as u64).min(self.size) - 1;
        let wanted = (end - offset + 1) as usize;
        let mut received = 0;

        while received < wanted {
            let chunk = self.fetch_range(offset + received as u64, end).await?;
            if chunk.is_empty() {
                bail!("Empty range response from {}", self.url);
            }
            let n = chunk.len().min(wanted - received);
            buf[received..received + n].copy_from_slice(&chunk[..n]);
            received += n;
            self.transferred_bytes.fetch_add(n as u64, Ordering::Relaxed);
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
