use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use anyhow::{Result, bail};

/// ZIP compression methods understood by the entry reader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }

    /// Whether entries using this method can be decompressed
    pub fn is_supported(&self) -> bool {
        !matches!(self, CompressionMethod::Unknown(_))
    }
}

impl std::fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompressionMethod::Stored => write!(f, "stored"),
            CompressionMethod::Deflate => write!(f, "deflate"),
            CompressionMethod::Unknown(v) => write!(f, "method {}", v),
        }
    }
}

/// Check a fixed-size record's signature and return a cursor over its fields
fn record<'a>(data: &'a [u8], signature: &[u8], size: usize, what: &str) -> Result<Cursor<&'a [u8]>> {
    if data.len() < size {
        bail!("Truncated {}: {} of {} bytes", what, data.len(), size);
    }
    if !data.starts_with(signature) {
        bail!("Bad {} signature", what);
    }
    Ok(Cursor::new(&data[signature.len()..size]))
}

/// End of Central Directory record, the fixed 22 byte part
#[derive(Debug)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut c = record(data, Self::SIGNATURE, Self::SIZE, "end of central directory")?;
        Ok(Self {
            disk_number: c.read_u16::<LittleEndian>()?,
            disk_with_cd: c.read_u16::<LittleEndian>()?,
            disk_entries: c.read_u16::<LittleEndian>()?,
            total_entries: c.read_u16::<LittleEndian>()?,
            cd_size: c.read_u32::<LittleEndian>()?,
            cd_offset: c.read_u32::<LittleEndian>()?,
            comment_len: c.read_u16::<LittleEndian>()?,
        })
    }

    /// Archives split over several disks are not supported
    pub fn spans_disks(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }

    /// Any saturated field means the real value lives in the ZIP64 record
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == u16::MAX
            || self.total_entries == u16::MAX
            || self.cd_size == u32::MAX
            || self.cd_offset == u32::MAX
    }
}

/// ZIP64 locator, found right before the regular EOCD
#[derive(Debug)]
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut c = record(data, Self::SIGNATURE, Self::SIZE, "ZIP64 locator")?;
        let _disk_with_eocd64 = c.read_u32::<LittleEndian>()?;
        Ok(Self {
            eocd64_offset: c.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory record, without its extensible data
#[derive(Debug)]
pub struct Zip64EOCD {
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut c = record(data, Self::SIGNATURE, Self::MIN_SIZE, "ZIP64 end of central directory")?;
        // Record size, then the two version fields
        c.set_position(12);
        Ok(Self {
            disk_number: c.read_u32::<LittleEndian>()?,
            disk_with_cd: c.read_u32::<LittleEndian>()?,
            disk_entries: c.read_u64::<LittleEndian>()?,
            total_entries: c.read_u64::<LittleEndian>()?,
            cd_size: c.read_u64::<LittleEndian>()?,
            cd_offset: c.read_u64::<LittleEndian>()?,
        })
    }

    pub fn spans_disks(&self) -> bool {
        self.disk_number != 0 || self.disk_with_cd != 0 || self.disk_entries != self.total_entries
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// General purpose flag bit marking an encrypted entry
pub const FLAG_ENCRYPTED: u16 = 0x0001;

/// Parsed ZIP file entry information
#[derive(Debug, Clone)]
pub struct ZipFileEntry {
    pub file_name: String,
    pub flags: u16,
    pub compression_method: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

impl ZipFileEntry {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_method_codes() {
        assert_eq!(CompressionMethod::from_u16(0), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_u16(8), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::from_u16(14), CompressionMethod::Unknown(14));
        assert_eq!(CompressionMethod::Unknown(9).as_u16(), 9);
        assert!(!CompressionMethod::Unknown(12).is_supported());
        assert_eq!(CompressionMethod::Unknown(12).to_string(), "method 12");
    }

    #[test]
    fn test_eocd_rejects_bad_signature() {
        let mut data = vec![0u8; EndOfCentralDirectory::SIZE];
        data[..4].copy_from_slice(b"PK\x03\x04");
        assert!(EndOfCentralDirectory::from_bytes(&data).is_err());
        assert!(EndOfCentralDirectory::from_bytes(b"PK\x05\x06").is_err());
    }

    #[test]
    fn test_eocd_zip64_markers() {
        let mut data = vec![0u8; EndOfCentralDirectory::SIZE];
        data[..4].copy_from_slice(EndOfCentralDirectory::SIGNATURE);
        data[10..12].copy_from_slice(&3u16.to_le_bytes());
        let eocd = EndOfCentralDirectory::from_bytes(&data).unwrap();
        assert_eq!(eocd.total_entries, 3);
        assert!(!eocd.is_zip64());
        assert!(eocd.spans_disks());

        data[8..10].copy_from_slice(&3u16.to_le_bytes());
        let eocd = EndOfCentralDirectory::from_bytes(&data).unwrap();
        assert!(!eocd.spans_disks());

        data[16..20].copy_from_slice(&0xFFFFFFFFu32.to_le_bytes());
        let eocd = EndOfCentralDirectory::from_bytes(&data).unwrap();
        assert!(eocd.is_zip64());
    }
}
