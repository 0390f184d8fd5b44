//! Byte-level zip writer.
//!
//! [`ArchiveWriter::write`] lays entries out as local file header plus
//! payload, then the central directory, then the end of central directory
//! record. A cursor starts at the writer's base offset (the length of any
//! prefix placed in front of the archive), so every offset recorded in the
//! central directory and the end record is absolute from the start of the
//! final file.
//!
//! Every entry carries the fixed DOS timestamp 1980-01-01 00:00:00 and Unix
//! permission bits, which keeps output byte-identical across builds.

use super::compression::{Compression, encode};
use super::{
    CENTRAL_HEADER_SIGNATURE, END_OF_CENTRAL_DIRECTORY_LEN, END_OF_CENTRAL_DIRECTORY_SIGNATURE,
    LOCAL_HEADER_SIGNATURE,
};
use crate::error::ArchiveError;
use crate::manifest::ManifestEntry;
use log::{debug, trace};

const LOCAL_HEADER_LEN: usize = 30;
const CENTRAL_HEADER_LEN: usize = 46;

/// DOS date for 1980-01-01: year 0, month 1, day 1.
const DOS_DATE: u16 = (1 << 5) | 1;
const DOS_TIME: u16 = 0;

/// "Version made by": Unix host, zip specification 2.0.
const VERSION_MADE_BY: u16 = (3 << 8) | 20;

/// General purpose flag bit 11: file name is UTF-8.
const FLAG_UTF8: u16 = 1 << 11;

const S_IFREG: u32 = 0o100_000;

/// Largest values the classic zip fields can hold without ZIP64.
///
/// The format reserves `0xFFFF_FFFF` and `0xFFFF` as ZIP64 markers, so the
/// defaults stop one short of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArchiveLimits {
    /// Limit for 32-bit sizes and offsets.
    pub max_field: u64,
    /// Limit for the 16-bit entry count.
    pub max_entries: u64,
    /// Limit for the 16-bit file name length.
    pub max_name_len: usize,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_field: 0xFFFF_FFFE,
            max_entries: 0xFFFE,
            max_name_len: 0xFFFF,
        }
    }
}

/// Where and how one entry was written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRecord {
    /// The entry's archive path.
    pub archive_path: String,
    /// The compression method actually used.
    pub method: Compression,
    /// Absolute offset of the local file header.
    pub local_header_offset: u64,
    /// CRC-32 of the uncompressed payload.
    pub crc32: u32,
    /// Bytes stored after the local header.
    pub compressed_size: u64,
    /// Length of the original payload.
    pub uncompressed_size: u64,
}

/// The serialised archive and where its parts landed.
#[derive(Clone, Debug)]
pub struct WrittenArchive {
    bytes: Vec<u8>,
    base_offset: u64,
    central_directory_offset: u64,
    central_directory_size: u64,
    records: Vec<EntryRecord>,
}

impl WrittenArchive {
    /// The archive bytes, without any prefix.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the archive, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// The offset the archive was written for.
    #[must_use]
    pub const fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Absolute offset of the central directory.
    #[must_use]
    pub const fn central_directory_offset(&self) -> u64 {
        self.central_directory_offset
    }

    /// Size of the central directory in bytes.
    #[must_use]
    pub const fn central_directory_size(&self) -> u64 {
        self.central_directory_size
    }

    /// One record per entry, in archive order.
    #[must_use]
    pub fn records(&self) -> &[EntryRecord] {
        &self.records
    }
}

/// Serialises manifest entries into a zip byte stream.
///
/// # Examples
///
/// ```
/// use pyzapp::archive::{ArchiveWriter, Compression};
/// use pyzapp::manifest::ManifestEntry;
///
/// let entries = [ManifestEntry::new("hello.py", b"print('hi')\n".to_vec())];
/// let written = ArchiveWriter::new(Compression::Stored)
///     .with_base_offset(23)
///     .write(&entries)
///     .expect("small archives fit");
/// assert_eq!(written.records()[0].local_header_offset, 23);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct ArchiveWriter {
    compression: Compression,
    base_offset: u64,
    limits: ArchiveLimits,
}

impl ArchiveWriter {
    /// A writer starting at offset zero with the classic zip limits.
    #[must_use]
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            ..Self::default()
        }
    }

    /// Record offsets as if `base_offset` bytes precede the archive.
    #[must_use]
    pub const fn with_base_offset(mut self, base_offset: u64) -> Self {
        self.base_offset = base_offset;
        self
    }

    /// Replace the size limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: ArchiveLimits) -> Self {
        self.limits = limits;
        self
    }

    /// The requested compression method.
    #[must_use]
    pub const fn compression(&self) -> Compression {
        self.compression
    }

    /// The configured base offset.
    #[must_use]
    pub const fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Serialise `entries` in order.
    ///
    /// # Errors
    ///
    /// Returns an [`ArchiveError`] when an entry, offset, the central
    /// directory, or the entry count exceeds the configured limits, or when
    /// compression fails. Nothing is truncated.
    pub fn write(&self, entries: &[ManifestEntry]) -> Result<WrittenArchive, ArchiveError> {
        let count = entries.len() as u64;
        if count > self.limits.max_entries {
            return Err(ArchiveError::ArchiveTooLarge {
                field: "entry count",
                value: count,
                limit: self.limits.max_entries,
            });
        }

        let mut bytes = Vec::new();
        let mut records = Vec::with_capacity(entries.len());
        let mut central = Vec::new();

        for entry in entries {
            let local_header_offset = self.base_offset + bytes.len() as u64;
            let record = self.write_local(&mut bytes, entry, local_header_offset)?;
            self.write_central(&mut central, entry, &record)?;
            debug!(
                "{}: {} {} -> {} bytes at offset {}",
                record.archive_path,
                record.method,
                record.uncompressed_size,
                record.compressed_size,
                record.local_header_offset
            );
            records.push(record);
        }

        let central_directory_offset = self.base_offset + bytes.len() as u64;
        let central_directory_size = central.len() as u64;
        let end_offset = central_directory_offset + central_directory_size;
        self.check_field("archive size", end_offset)?;
        bytes.extend_from_slice(&central);

        let entry_count = self.entry_count(count)?;
        put_u32(&mut bytes, END_OF_CENTRAL_DIRECTORY_SIGNATURE);
        put_u16(&mut bytes, 0);
        put_u16(&mut bytes, 0);
        put_u16(&mut bytes, entry_count);
        put_u16(&mut bytes, entry_count);
        put_u32(
            &mut bytes,
            self.field("central directory size", central_directory_size)?,
        );
        put_u32(
            &mut bytes,
            self.field("central directory offset", central_directory_offset)?,
        );
        put_u16(&mut bytes, 0);

        trace!(
            "central directory: {count} record(s), {central_directory_size} bytes at offset {central_directory_offset}"
        );
        Ok(WrittenArchive {
            bytes,
            base_offset: self.base_offset,
            central_directory_offset,
            central_directory_size,
            records,
        })
    }

    fn write_local(
        &self,
        out: &mut Vec<u8>,
        entry: &ManifestEntry,
        local_header_offset: u64,
    ) -> Result<EntryRecord, ArchiveError> {
        let path = entry.archive_path();
        let payload = entry.payload();
        let uncompressed_size = payload.len() as u64;
        if uncompressed_size > self.limits.max_field {
            return Err(ArchiveError::EntryTooLarge {
                path: path.to_owned(),
                size: uncompressed_size,
                limit: self.limits.max_field,
            });
        }
        self.check_field("local header offset", local_header_offset)?;
        let name_len = self.name_len(path)?;

        let encoded = encode(path, payload, self.compression)?;
        let compressed_size = encoded.data.len() as u64;
        let crc32 = crc32fast::hash(payload);

        let record = EntryRecord {
            archive_path: path.to_owned(),
            method: encoded.method,
            local_header_offset,
            crc32,
            compressed_size,
            uncompressed_size,
        };

        out.reserve(LOCAL_HEADER_LEN + path.len() + encoded.data.len());
        put_u32(out, LOCAL_HEADER_SIGNATURE);
        put_u16(out, record.method.version_needed());
        put_u16(out, flags(path));
        put_u16(out, record.method.method());
        put_u16(out, DOS_TIME);
        put_u16(out, DOS_DATE);
        put_u32(out, crc32);
        put_u32(out, self.field("compressed size", compressed_size)?);
        put_u32(out, self.field("uncompressed size", uncompressed_size)?);
        put_u16(out, name_len);
        put_u16(out, 0);
        out.extend_from_slice(path.as_bytes());
        out.extend_from_slice(&encoded.data);
        Ok(record)
    }

    fn write_central(
        &self,
        out: &mut Vec<u8>,
        entry: &ManifestEntry,
        record: &EntryRecord,
    ) -> Result<(), ArchiveError> {
        let path = entry.archive_path();
        out.reserve(CENTRAL_HEADER_LEN + path.len());
        put_u32(out, CENTRAL_HEADER_SIGNATURE);
        put_u16(out, VERSION_MADE_BY);
        put_u16(out, record.method.version_needed());
        put_u16(out, flags(path));
        put_u16(out, record.method.method());
        put_u16(out, DOS_TIME);
        put_u16(out, DOS_DATE);
        put_u32(out, record.crc32);
        put_u32(out, self.field("compressed size", record.compressed_size)?);
        put_u32(
            out,
            self.field("uncompressed size", record.uncompressed_size)?,
        );
        put_u16(out, self.name_len(path)?);
        put_u16(out, 0);
        put_u16(out, 0);
        put_u16(out, 0);
        put_u16(out, 0);
        put_u32(out, (S_IFREG | entry.mode()) << 16);
        put_u32(
            out,
            self.field("local header offset", record.local_header_offset)?,
        );
        out.extend_from_slice(path.as_bytes());
        Ok(())
    }

    fn check_field(&self, field: &'static str, value: u64) -> Result<(), ArchiveError> {
        if value > self.limits.max_field {
            return Err(ArchiveError::ArchiveTooLarge {
                field,
                value,
                limit: self.limits.max_field,
            });
        }
        Ok(())
    }

    fn field(&self, field: &'static str, value: u64) -> Result<u32, ArchiveError> {
        self.check_field(field, value)?;
        u32::try_from(value).map_err(|_| ArchiveError::ArchiveTooLarge {
            field,
            value,
            limit: u64::from(u32::MAX),
        })
    }

    fn entry_count(&self, count: u64) -> Result<u16, ArchiveError> {
        u16::try_from(count).map_err(|_| ArchiveError::ArchiveTooLarge {
            field: "entry count",
            value: count,
            limit: self.limits.max_entries,
        })
    }

    fn name_len(&self, path: &str) -> Result<u16, ArchiveError> {
        let too_long = || ArchiveError::PathTooLong {
            path: abbreviate(path),
            length: path.len(),
            limit: self.limits.max_name_len,
        };
        if path.len() > self.limits.max_name_len {
            return Err(too_long());
        }
        u16::try_from(path.len()).map_err(|_| too_long())
    }
}

/// Read the central directory offset and entry count from the end record of
/// `bytes`, which must end with a comment-less record.
#[must_use]
pub fn read_end_of_central_directory(bytes: &[u8]) -> Option<(u16, u32)> {
    let start = bytes.len().checked_sub(END_OF_CENTRAL_DIRECTORY_LEN)?;
    let record = &bytes[start..];
    let signature = u32::from_le_bytes(record.get(0..4)?.try_into().ok()?);
    if signature != END_OF_CENTRAL_DIRECTORY_SIGNATURE {
        return None;
    }
    let count = u16::from_le_bytes(record.get(10..12)?.try_into().ok()?);
    let offset = u32::from_le_bytes(record.get(16..20)?.try_into().ok()?);
    Some((count, offset))
}

fn flags(path: &str) -> u16 {
    if path.is_ascii() { 0 } else { FLAG_UTF8 }
}

fn abbreviate(path: &str) -> String {
    const SHOWN: usize = 64;
    match path.char_indices().nth(SHOWN) {
        Some((cut, _)) => format!("{}...", &path[..cut]),
        None => path.to_owned(),
    }
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
