//! Manifest collection.
//!
//! A [`Manifest`] is the ordered list of files selected for packaging. It is
//! built by walking a root directory, filtering every file through a
//! [`RuleSet`], and reading the survivors into memory. Paths are stored in
//! POSIX form relative to the archive root and are unique within a manifest.
//! The collected manifest is sorted by archive path so repeated builds of
//! the same tree produce the same archive.

use crate::error::ManifestError;
use crate::rules::{Rule, RuleSet};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, trace};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Permission bits used where the platform does not expose them.
pub const DEFAULT_MODE: u32 = 0o644;

/// A single file destined for the archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    archive_path: String,
    payload: Vec<u8>,
    mode: u32,
}

impl ManifestEntry {
    /// Create an entry with the default permission bits.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyzapp::manifest::{DEFAULT_MODE, ManifestEntry};
    ///
    /// let entry = ManifestEntry::new("app/main.py", b"print('hi')".to_vec());
    /// assert_eq!(entry.archive_path(), "app/main.py");
    /// assert_eq!(entry.mode(), DEFAULT_MODE);
    /// ```
    #[must_use]
    pub fn new(archive_path: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            archive_path: archive_path.into(),
            payload: payload.into(),
            mode: DEFAULT_MODE,
        }
    }

    /// Replace the permission bits. Only the lower nine bits are kept.
    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode & 0o777;
        self
    }

    /// The POSIX-style path inside the archive.
    #[must_use]
    pub fn archive_path(&self) -> &str {
        &self.archive_path
    }

    /// The uncompressed file contents.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The permission bits (`0o000`..=`0o777`).
    #[must_use]
    pub const fn mode(&self) -> u32 {
        self.mode
    }
}

/// An ordered collection of entries with unique archive paths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Create an empty manifest.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Build a manifest from entries, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns an error when a path is not a valid archive path or appears
    /// twice.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ManifestEntry>,
    ) -> Result<Self, ManifestError> {
        let mut manifest = Self::new();
        manifest.extend(entries)?;
        Ok(manifest)
    }

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::InvalidArchivePath`] for malformed paths and
    /// [`ManifestError::DuplicatePath`] when the path is already present.
    pub fn push(&mut self, entry: ManifestEntry) -> Result<(), ManifestError> {
        validate_archive_path(entry.archive_path())?;
        if self.contains(entry.archive_path()) {
            return Err(ManifestError::DuplicatePath {
                path: entry.archive_path,
            });
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Append several entries in order.
    ///
    /// # Errors
    ///
    /// Fails on the first entry [`Manifest::push`] would reject.
    pub fn extend(
        &mut self,
        entries: impl IntoIterator<Item = ManifestEntry>,
    ) -> Result<(), ManifestError> {
        entries.into_iter().try_for_each(|entry| self.push(entry))
    }

    /// Remove and return the entry stored at `archive_path`.
    pub fn remove(&mut self, archive_path: &str) -> Option<ManifestEntry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.archive_path == archive_path)?;
        Some(self.entries.remove(index))
    }

    /// Whether an entry exists at `archive_path`.
    #[must_use]
    pub fn contains(&self, archive_path: &str) -> bool {
        self.get(archive_path).is_some()
    }

    /// Look up the entry stored at `archive_path`.
    #[must_use]
    pub fn get(&self, archive_path: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find(|entry| entry.archive_path == archive_path)
    }

    /// The entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Consume the manifest, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the manifest holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| entry.payload.len() as u64)
            .sum()
    }
}

/// Settings for [`collect`].
#[derive(Clone, Debug, Default)]
pub struct CollectOptions {
    /// Ordered include/exclude rules. Empty means `include *.py`.
    pub rules: Vec<Rule>,
    /// Directory inside the archive that receives every collected file.
    pub archive_base: Option<String>,
    /// Package the targets of symbolic links instead of rejecting them.
    pub follow_symlinks: bool,
}

/// Walk `root` and collect every file the rules select.
///
/// Directories never produce entries. Selected symbolic links are rejected
/// unless [`CollectOptions::follow_symlinks`] is set; a link to a directory
/// is always rejected in that case because its contents are never walked. The result is sorted by
/// archive path and may be empty; callers decide whether that is an error.
///
/// # Errors
///
/// Returns a [`ManifestError`] when the root is missing or not a directory,
/// a rule is invalid, a selected file is an unfollowed symlink, or a file
/// cannot be read.
pub fn collect(root: &Utf8Path, options: &CollectOptions) -> Result<Manifest, ManifestError> {
    check_root(root)?;
    let rules = RuleSet::compile(&options.rules)?;
    let base = options
        .archive_base
        .as_deref()
        .map(normalise_base)
        .transpose()?
        .flatten();

    let mut selected = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();
    for item in walker {
        let entry = item.map_err(|err| walk_error(root, err))?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path_is_symlink() && entry.path().is_dir() {
            return Err(ManifestError::SymlinkRejected {
                path: display_path(entry.path()),
            });
        }

        let relative = relative_path(root, entry.path())?;
        match rules.deciding_rule(&relative) {
            Some(rule) if rule.is_include() => trace!("{relative}: selected by `{rule}`"),
            Some(rule) => {
                debug!("{relative}: skipped by `{rule}`");
                continue;
            }
            None => {
                trace!("{relative}: no rule matches");
                continue;
            }
        }

        if entry.file_type().is_symlink() {
            return Err(ManifestError::SymlinkRejected {
                path: display_path(entry.path()),
            });
        }
        if !entry.file_type().is_file() {
            debug!("{relative}: not a regular file, skipped");
            continue;
        }
        selected.push((relative, entry.into_path()));
    }

    selected.sort_by(|(left, _), (right, _)| left.cmp(right));

    let mut manifest = Manifest::new();
    for (relative, path) in selected {
        let archive_path = match &base {
            Some(base) => format!("{base}/{relative}"),
            None => relative,
        };
        manifest.push(read_entry(&path, archive_path)?)?;
    }
    debug!(
        "collected {} file(s), {} bytes, from {root}",
        manifest.len(),
        manifest.payload_size()
    );
    Ok(manifest)
}

/// Check that `path` can be stored in an archive.
///
/// Archive paths are relative, use `/` separators, and contain no empty,
/// `.` or `..` segments.
///
/// # Errors
///
/// Returns [`ManifestError::InvalidArchivePath`] describing the first
/// problem found.
pub fn validate_archive_path(path: &str) -> Result<(), ManifestError> {
    let reason = if path.is_empty() {
        Some("path is empty")
    } else if path.starts_with('/') {
        Some("path must be relative")
    } else if path.contains('\\') {
        Some("path must use `/` separators")
    } else if path.contains('\0') {
        Some("path contains a NUL byte")
    } else if path
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        Some("path contains an empty, `.` or `..` segment")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ManifestError::InvalidArchivePath {
            path: path.to_owned(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Trim surrounding slashes from an archive base and validate it.
///
/// An empty or all-slash base means "no base".
fn normalise_base(base: &str) -> Result<Option<String>, ManifestError> {
    let trimmed = base.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Ok(None);
    }
    validate_archive_path(trimmed)?;
    Ok(Some(trimmed.to_owned()))
}

fn check_root(root: &Utf8Path) -> Result<(), ManifestError> {
    let metadata = fs::metadata(root).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ManifestError::RootNotFound {
                path: root.to_owned(),
            }
        } else {
            ManifestError::Unreadable {
                path: root.to_owned(),
                source,
            }
        }
    })?;
    if metadata.is_dir() {
        Ok(())
    } else {
        Err(ManifestError::RootNotDirectory {
            path: root.to_owned(),
        })
    }
}

fn read_entry(path: &Path, archive_path: String) -> Result<ManifestEntry, ManifestError> {
    let unreadable = |source| ManifestError::Unreadable {
        path: display_path(path),
        source,
    };
    let metadata = fs::metadata(path).map_err(unreadable)?;
    let payload = fs::read(path).map_err(unreadable)?;
    Ok(ManifestEntry::new(archive_path, payload).with_mode(source_mode(&metadata)))
}

#[cfg(unix)]
fn source_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn source_mode(_metadata: &fs::Metadata) -> u32 {
    DEFAULT_MODE
}

/// Express `path` relative to `root` as a `/`-separated string.
fn relative_path(root: &Utf8Path, path: &Path) -> Result<String, ManifestError> {
    let invalid = |reason| ManifestError::InvalidArchivePath {
        path: path.to_string_lossy().into_owned(),
        reason,
    };
    let relative = path
        .strip_prefix(root.as_std_path())
        .map_err(|_| invalid("path escapes the source root"))?;
    let relative =
        Utf8Path::from_path(relative).ok_or_else(|| invalid("path is not valid UTF-8"))?;
    Ok(relative
        .components()
        .map(|component| component.as_str())
        .collect::<Vec<_>>()
        .join("/"))
}

fn walk_error(root: &Utf8Path, err: walkdir::Error) -> ManifestError {
    let path = err.path().map_or_else(|| root.to_owned(), display_path);
    ManifestError::Unreadable {
        path,
        source: err.into(),
    }
}

fn display_path(path: &Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path.to_string_lossy().into_owned())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
