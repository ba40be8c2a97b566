//! In-memory archives for unit tests.

use anyhow::Result;
use async_trait::async_trait;

use crate::io::ReadAt;

pub use super::archive_builder::{ArchiveBuilder, Zip64Extra};

pub struct MemoryReader {
    data: Vec<u8>,
}

impl MemoryReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ReadAt for MemoryReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = (offset as usize).min(self.data.len());
        let end = (start + buf.len()).min(self.data.len());
        buf[..end - start].copy_from_slice(&self.data[start..end]);
        Ok(end - start)
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }
}
