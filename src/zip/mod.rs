//! ZIP archive backend.
//!
//! Opening an archive reads only its tail: the End of Central Directory
//! record (or its ZIP64 counterpart) locates the central directory, which is
//! parsed into a list of [`ZipFileEntry`]. Serving an entry then reads its
//! local header and compressed bytes, nothing else. For a remote archive that
//! means three or four range requests per served file.
//!
//! Entries may be STORED or DEFLATE compressed; their CRC-32 is verified as
//! they are read. Encrypted entries, other compression methods and archives
//! spanning several disks are rejected.

#[cfg(test)]
mod archive_builder;
mod backend;
#[cfg(test)]
pub(crate) mod fixtures;
mod parser;
mod structures;

pub use backend::{ZipArchive, ZipBackend, ZipEntryReader};
pub use parser::ZipParser;
pub use structures::*;
