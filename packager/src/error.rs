//! Error types for pyzapp builds.
//!
//! Each layer has its own semantic error enum: [`ManifestError`] for file
//! collection, [`ArchiveError`] for the archive writer's size limits, and
//! [`BuildError`] for everything the build pipeline reports to the caller.
//! Variants carry the path, rule, or limit a user needs to fix the problem.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while turning a source tree into a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The source root does not exist.
    #[error("source root {path} does not exist")]
    RootNotFound {
        /// The missing root directory.
        path: Utf8PathBuf,
    },

    /// The source root exists but is not a directory.
    #[error("source root {path} is not a directory")]
    RootNotDirectory {
        /// The offending path.
        path: Utf8PathBuf,
    },

    /// A file or directory below the root could not be read.
    #[error("failed to read {path}: {source}")]
    Unreadable {
        /// Path that failed to read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An include or exclude glob could not be compiled.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern as written by the user.
        pattern: String,
        /// Why the pattern was rejected.
        reason: String,
    },

    /// A selected file is a symbolic link and links are not followed.
    #[error("refusing to package symbolic link {path}; enable follow_symlinks to package its target")]
    SymlinkRejected {
        /// Path of the link.
        path: Utf8PathBuf,
    },

    /// A path cannot be represented inside a zip archive.
    #[error("path `{path}` cannot be stored in an archive: {reason}")]
    InvalidArchivePath {
        /// The offending path.
        path: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Two entries claim the same archive path.
    #[error("archive path {path} is provided more than once")]
    DuplicatePath {
        /// The duplicated archive path.
        path: String,
    },

    /// The rules selected no files at all.
    #[error("nothing to package: no files under {root} matched the include rules")]
    NothingToPackage {
        /// The root directory that was scanned.
        root: Utf8PathBuf,
    },

    /// An archive was requested for a manifest with no entries.
    #[error("nothing to package: the manifest is empty")]
    EmptyManifest,

    /// The configured entry point is not one of the collected files.
    #[error("entry point {path} is not part of the packaged files")]
    EntryPointMissing {
        /// Archive path of the expected entry point.
        path: String,
    },
}

/// Errors raised by the archive writer.
///
/// The writer does not emit ZIP64 records, so every limit here is a hard
/// stop rather than a trigger for the 64-bit extension.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// A single entry is larger than a classic zip size field can describe.
    #[error("archive too large: {path} is {size} bytes, the limit per entry is {limit}")]
    EntryTooLarge {
        /// Archive path of the entry.
        path: String,
        /// Size of the entry in bytes.
        size: u64,
        /// Largest size the format can record.
        limit: u64,
    },

    /// An offset or total exceeds what a classic zip field can describe.
    #[error("archive too large: {field} reaches {value}, the limit is {limit}")]
    ArchiveTooLarge {
        /// Which field overflowed.
        field: &'static str,
        /// The value that did not fit.
        value: u64,
        /// Largest value the format can record.
        limit: u64,
    },

    /// An archive path is longer than the 16-bit name length field allows.
    #[error("archive path {path} is {length} bytes long, the limit is {limit}")]
    PathTooLong {
        /// The archive path, possibly abbreviated.
        path: String,
        /// Its length in bytes.
        length: usize,
        /// Longest name the format can record.
        limit: usize,
    },

    /// The compression transform failed.
    #[error("failed to compress {path}: {source}")]
    Compression {
        /// Archive path of the entry being compressed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by a build.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Collecting the manifest failed.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Writing the archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The output file already exists and overwriting was not requested.
    #[error("destination {path} exists; pass --force to overwrite it")]
    DestinationExists {
        /// The existing output path.
        path: Utf8PathBuf,
    },

    /// Writing the output file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// The output path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A Python version or version range is malformed.
    #[error("invalid Python version constraint: {reason}")]
    InvalidVersionConstraint {
        /// Description of the problem.
        reason: String,
    },

    /// The entry point cannot be used to start the application.
    #[error("invalid entry point {path}: {reason}")]
    InvalidEntryPoint {
        /// The entry point as configured.
        path: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A bootstrap setting cannot be embedded in generated code.
    #[error("invalid bootstrap setting {setting}: {reason}")]
    InvalidBootstrapSetting {
        /// Name of the setting.
        setting: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The executable prefix is malformed.
    #[error("invalid prefix: {reason}")]
    InvalidPrefix {
        /// Description of the problem.
        reason: String,
    },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration {path}: {reason}")]
    Config {
        /// Path to the configuration file.
        path: Utf8PathBuf,
        /// Description of the problem.
        reason: String,
    },

    /// A required setting was given neither on the command line nor in the
    /// configuration file.
    #[error("missing required setting: {name}")]
    MissingSetting {
        /// Name of the missing setting.
        name: &'static str,
    },

    /// A dependency source failed to produce its entries.
    #[error("dependency source {source_name} failed: {reason}")]
    Dependencies {
        /// Name of the dependency source.
        source_name: String,
        /// Description of the failure.
        reason: String,
    },

    /// The plain and executable outputs name the same file.
    #[error("output and unix_output both name {path}; choose distinct paths")]
    OutputsCollide {
        /// The path given for both outputs.
        path: Utf8PathBuf,
    },
}

/// Result type alias using [`BuildError`].
pub type Result<T> = std::result::Result<T, BuildError>;
