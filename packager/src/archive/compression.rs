//! Per-entry compression.
//!
//! Entries are either stored verbatim or compressed with raw deflate. Deflate
//! is only kept when it actually shrinks the payload; otherwise the entry
//! falls back to storage so tiny or already-compressed files never grow.

use crate::error::ArchiveError;
use clap::ValueEnum;
use flate2::write::DeflateEncoder;
use serde::Deserialize;
use std::borrow::Cow;
use std::fmt;
use std::io::Write;

/// Compression method for archive entries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Store payloads uncompressed (zip method 0).
    Stored,
    /// Compress payloads with raw deflate (zip method 8).
    #[default]
    Deflated,
}

impl Compression {
    /// The zip compression method number.
    #[must_use]
    pub const fn method(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflated => 8,
        }
    }

    /// The "version needed to extract" for entries using this method.
    #[must_use]
    pub const fn version_needed(self) -> u16 {
        match self {
            Self::Stored => 10,
            Self::Deflated => 20,
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stored => "stored",
            Self::Deflated => "deflated",
        })
    }
}

/// A payload after the compression transform.
#[derive(Debug)]
pub struct Encoded<'a> {
    /// The method actually used.
    pub method: Compression,
    /// The bytes written after the local header.
    pub data: Cow<'a, [u8]>,
}

/// Apply `requested` to `payload`, falling back to storage when deflate does
/// not help.
///
/// # Errors
///
/// Returns [`ArchiveError::Compression`] when the deflate stream fails.
pub fn encode<'a>(
    archive_path: &str,
    payload: &'a [u8],
    requested: Compression,
) -> Result<Encoded<'a>, ArchiveError> {
    let stored = Encoded {
        method: Compression::Stored,
        data: Cow::Borrowed(payload),
    };
    if requested == Compression::Stored || payload.is_empty() {
        return Ok(stored);
    }

    let failed = |source| ArchiveError::Compression {
        path: archive_path.to_owned(),
        source,
    };
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(payload.len() / 2),
        flate2::Compression::default(),
    );
    encoder.write_all(payload).map_err(failed)?;
    let compressed = encoder.finish().map_err(failed)?;

    if compressed.len() < payload.len() {
        Ok(Encoded {
            method: Compression::Deflated,
            data: Cow::Owned(compressed),
        })
    } else {
        Ok(stored)
    }
}
