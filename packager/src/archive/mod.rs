//! Zip archive serialisation.
//!
//! The writer produces classic (non-ZIP64) zip archives whose offsets are
//! absolute from the start of the final file, so the archive can sit behind
//! an arbitrary prefix such as a shebang line. Compression is negotiated per
//! entry in [`compression`]; the byte layout lives in [`writer`].

pub mod compression;
pub mod writer;

pub use compression::Compression;
pub use writer::{ArchiveLimits, ArchiveWriter, EntryRecord, WrittenArchive};

/// Local file header signature (`PK\x03\x04`).
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4b50;

/// Central directory file header signature (`PK\x01\x02`).
pub const CENTRAL_HEADER_SIGNATURE: u32 = 0x0201_4b50;

/// End of central directory record signature (`PK\x05\x06`).
pub const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x0605_4b50;

/// Size in bytes of the end of central directory record without a comment.
pub const END_OF_CENTRAL_DIRECTORY_LEN: usize = 22;
