//! ZIP writer for tests.
//!
//! Only depends on external crates so the integration tests can include the
//! same file with `#[path]`.

use byteorder::{LittleEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use std::io::Write;
use std::path::Path;

const SATURATED: u32 = 0xFFFF_FFFF;

/// Values written into an entry's ZIP64 extra field.
///
/// `None` writes the entry's real value, `Some` overrides it.
#[derive(Debug, Default, Clone, Copy)]
pub struct Zip64Extra {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub lfh_offset: Option<u64>,
}

struct Entry {
    name: String,
    method: u16,
    flags: u16,
    crc32: u32,
    uncompressed_size: u32,
    payload: Vec<u8>,
    zip64: Option<Zip64Extra>,
}

#[derive(Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
    comment: Vec<u8>,
    zip64_directory: bool,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.raw(name, 0, 0, crc32fast::hash(data), data.len() as u32, data.to_vec())
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        let payload = encoder.finish().unwrap();
        self.raw(name, 8, 0, crc32fast::hash(data), data.len() as u32, payload)
    }

    /// Stored entry whose recorded CRC does not match its data
    pub fn corrupt(self, name: &str, data: &[u8]) -> Self {
        self.raw(name, 0, 0, !crc32fast::hash(data), data.len() as u32, data.to_vec())
    }

    /// Add an entry with every header field under the caller's control
    pub fn raw(
        mut self,
        name: &str,
        method: u16,
        flags: u16,
        crc32: u32,
        uncompressed_size: u32,
        payload: Vec<u8>,
    ) -> Self {
        self.entries.push(Entry {
            name: name.to_string(),
            method,
            flags,
            crc32,
            uncompressed_size,
            payload,
            zip64: None,
        });
        self
    }

    /// Move the last entry's sizes and offset into a ZIP64 extra field
    pub fn zip64_extra(mut self, extra: Zip64Extra) -> Self {
        if let Some(entry) = self.entries.last_mut() {
            entry.zip64 = Some(extra);
        }
        self
    }

    /// Locate the central directory through a ZIP64 record and locator
    pub fn zip64_directory(mut self) -> Self {
        self.zip64_directory = true;
        self
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut offsets = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            offsets.push(out.len() as u64);
            out.extend_from_slice(b"PK\x03\x04");
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(entry.flags).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u32::<LittleEndian>(0x0021_0000).unwrap();
            out.write_u32::<LittleEndian>(entry.crc32).unwrap();
            out.write_u32::<LittleEndian>(entry.payload.len() as u32).unwrap();
            out.write_u32::<LittleEndian>(entry.uncompressed_size).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&entry.payload);
        }

        let cd_offset = out.len() as u64;
        for (entry, offset) in self.entries.iter().zip(offsets) {
            let mut extra = Vec::new();
            let (compressed, uncompressed, lfh_offset) = match entry.zip64 {
                Some(values) => {
                    extra.write_u16::<LittleEndian>(0x0001).unwrap();
                    extra.write_u16::<LittleEndian>(24).unwrap();
                    extra
                        .write_u64::<LittleEndian>(
                            values.uncompressed_size.unwrap_or(entry.uncompressed_size as u64),
                        )
                        .unwrap();
                    extra
                        .write_u64::<LittleEndian>(
                            values.compressed_size.unwrap_or(entry.payload.len() as u64),
                        )
                        .unwrap();
                    extra
                        .write_u64::<LittleEndian>(values.lfh_offset.unwrap_or(offset))
                        .unwrap();
                    (SATURATED, SATURATED, SATURATED)
                }
                None => (
                    entry.payload.len() as u32,
                    entry.uncompressed_size,
                    offset as u32,
                ),
            };

            out.extend_from_slice(b"PK\x01\x02");
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u16::<LittleEndian>(20).unwrap();
            out.write_u16::<LittleEndian>(entry.flags).unwrap();
            out.write_u16::<LittleEndian>(entry.method).unwrap();
            out.write_u32::<LittleEndian>(0x0021_0000).unwrap();
            out.write_u32::<LittleEndian>(entry.crc32).unwrap();
            out.write_u32::<LittleEndian>(compressed).unwrap();
            out.write_u32::<LittleEndian>(uncompressed).unwrap();
            out.write_u16::<LittleEndian>(entry.name.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(extra.len() as u16).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u16::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(lfh_offset).unwrap();
            out.extend_from_slice(entry.name.as_bytes());
            out.extend_from_slice(&extra);
        }
        let cd_size = out.len() as u64 - cd_offset;
        let count = self.entries.len() as u64;

        if self.zip64_directory {
            let record_offset = out.len() as u64;
            out.extend_from_slice(b"PK\x06\x06");
            out.write_u64::<LittleEndian>(44).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u16::<LittleEndian>(45).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(count).unwrap();
            out.write_u64::<LittleEndian>(count).unwrap();
            out.write_u64::<LittleEndian>(cd_size).unwrap();
            out.write_u64::<LittleEndian>(cd_offset).unwrap();

            out.extend_from_slice(b"PK\x06\x07");
            out.write_u32::<LittleEndian>(0).unwrap();
            out.write_u64::<LittleEndian>(record_offset).unwrap();
            out.write_u32::<LittleEndian>(1).unwrap();
        }

        let (eocd_count, eocd_size, eocd_offset) = if self.zip64_directory {
            (u16::MAX, SATURATED, SATURATED)
        } else {
            (count as u16, cd_size as u32, cd_offset as u32)
        };
        out.extend_from_slice(b"PK\x05\x06");
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(0).unwrap();
        out.write_u16::<LittleEndian>(eocd_count).unwrap();
        out.write_u16::<LittleEndian>(eocd_count).unwrap();
        out.write_u32::<LittleEndian>(eocd_size).unwrap();
        out.write_u32::<LittleEndian>(eocd_offset).unwrap();
        out.write_u16::<LittleEndian>(self.comment.len() as u16).unwrap();
        out.extend_from_slice(&self.comment);
        out
    }

    /// Write the archive to `dir/name` and return its path
    pub fn write_to(&self, dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.build()).unwrap();
        path
    }
}
