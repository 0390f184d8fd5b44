//! Executable prefixes and archive composition.
//!
//! Zip readers locate an archive from its end record, so arbitrary bytes may
//! precede the first local header as long as every recorded offset accounts
//! for them. [`compose`] writes the archive with its base offset set to the
//! prefix length and concatenates the two.

use crate::archive::{ArchiveWriter, EntryRecord};
use crate::error::{ArchiveError, BuildError, Result};
use crate::layout::ArchiveLayout;

/// Interpreter used when a shebang is requested without one.
pub const DEFAULT_INTERPRETER: &str = "/usr/bin/env python3";

/// Bytes placed in front of the archive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Prefix {
    bytes: Vec<u8>,
}

impl Prefix {
    /// No prefix: the output is a plain zip archive.
    #[must_use]
    pub const fn none() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Use `text` verbatim, normalised to end with exactly one newline.
    ///
    /// Empty text means no prefix.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyzapp::prefix::Prefix;
    ///
    /// let prefix = Prefix::raw("#!/usr/bin/python3\n\n\n");
    /// assert_eq!(prefix.as_bytes(), b"#!/usr/bin/python3\n");
    /// assert!(Prefix::raw("").is_empty());
    /// ```
    #[must_use]
    pub fn raw(text: &str) -> Self {
        let body = text.trim_end_matches(['\n', '\r']);
        if body.is_empty() {
            return Self::none();
        }
        let mut bytes = Vec::with_capacity(body.len() + 1);
        bytes.extend_from_slice(body.as_bytes());
        bytes.push(b'\n');
        Self { bytes }
    }

    /// Build a `#!` line for `interpreter`, or for
    /// [`DEFAULT_INTERPRETER`] when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidPrefix`] when the interpreter spans
    /// several lines.
    pub fn shebang(interpreter: Option<&str>) -> Result<Self> {
        let interpreter = interpreter
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .unwrap_or(DEFAULT_INTERPRETER);
        if interpreter.contains(['\n', '\r']) {
            return Err(BuildError::InvalidPrefix {
                reason: "the shebang must be a single line".to_owned(),
            });
        }
        let line = interpreter.strip_prefix("#!").map_or_else(
            || format!("#!{interpreter}"),
            |rest| format!("#!{}", rest.trim_start()),
        );
        Ok(Self::raw(&line))
    }

    /// The prefix bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the prefix in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether there is no prefix.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A complete output file: prefix followed by the archive.
#[derive(Clone, Debug)]
pub struct ComposedArchive {
    bytes: Vec<u8>,
    prefix_len: usize,
    central_directory_offset: u64,
    records: Vec<EntryRecord>,
}

impl ComposedArchive {
    /// The full file contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the archive, returning the file contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Whether the file starts with a prefix.
    #[must_use]
    pub const fn has_prefix(&self) -> bool {
        self.prefix_len > 0
    }

    /// Length of the prefix in bytes.
    #[must_use]
    pub const fn prefix_len(&self) -> usize {
        self.prefix_len
    }

    /// Absolute offset of the central directory.
    #[must_use]
    pub const fn central_directory_offset(&self) -> u64 {
        self.central_directory_offset
    }

    /// Where each entry was written.
    #[must_use]
    pub fn records(&self) -> &[EntryRecord] {
        &self.records
    }
}

/// Serialise `layout` behind its prefix.
///
/// The writer's base offset is replaced with the prefix length, so the same
/// `writer` can compose layouts with different prefixes.
///
/// # Errors
///
/// Propagates [`ArchiveError`] from the writer.
pub fn compose(
    layout: &ArchiveLayout,
    writer: &ArchiveWriter,
) -> std::result::Result<ComposedArchive, ArchiveError> {
    let prefix = layout.prefix();
    let written = writer
        .with_base_offset(prefix.len() as u64)
        .write(layout.entries())?;

    let central_directory_offset = written.central_directory_offset();
    let records = written.records().to_vec();
    let mut bytes = Vec::with_capacity(prefix.len() + written.bytes().len());
    bytes.extend_from_slice(prefix.as_bytes());
    bytes.extend_from_slice(&written.into_bytes());

    Ok(ComposedArchive {
        bytes,
        prefix_len: prefix.len(),
        central_directory_offset,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("#!/usr/bin/python3", b"#!/usr/bin/python3\n")]
    #[case::one_newline("#!/bin/py\n", b"#!/bin/py\n")]
    #[case::many_newlines("#!/bin/py\n\n\r\n", b"#!/bin/py\n")]
    #[case::multi_line_text("line one\nline two", b"line one\nline two\n")]
    fn raw_prefixes_end_with_one_newline(#[case] text: &str, #[case] expected: &[u8]) {
        assert_eq!(Prefix::raw(text).as_bytes(), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::only_newlines("\n\n")]
    fn empty_text_means_no_prefix(#[case] text: &str) {
        assert!(Prefix::raw(text).is_empty());
    }

    #[rstest]
    #[case::default(None, b"#!/usr/bin/env python3\n")]
    #[case::blank(Some("  "), b"#!/usr/bin/env python3\n")]
    #[case::bare_path(Some("/opt/python/bin/python3.11"), b"#!/opt/python/bin/python3.11\n")]
    #[case::marked(Some("#!/usr/bin/python3"), b"#!/usr/bin/python3\n")]
    #[case::marked_with_space(Some("#! /usr/bin/python3"), b"#!/usr/bin/python3\n")]
    fn shebangs_gain_the_marker(#[case] interpreter: Option<&str>, #[case] expected: &[u8]) {
        let prefix = Prefix::shebang(interpreter).expect("valid shebang");
        assert_eq!(prefix.as_bytes(), expected);
    }

    #[test]
    fn multi_line_shebangs_are_rejected() {
        let err = Prefix::shebang(Some("/usr/bin/python3\nrm -rf /")).expect_err("two lines");
        assert!(matches!(err, BuildError::InvalidPrefix { .. }));
    }
}
