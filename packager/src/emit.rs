//! Writing the finished archive to disk.
//!
//! The bytes go to a temporary file next to the destination and are then
//! moved into place, so a failed build never leaves a partial file behind.
//! An existing destination is only replaced when `force` is set.

use crate::error::{BuildError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::fs;
use std::io::{ErrorKind, Write};
use tempfile::NamedTempFile;

/// Permission bits for executable archives.
pub const EXECUTABLE_MODE: u32 = 0o755;

/// Permission bits for plain archives.
pub const PLAIN_MODE: u32 = 0o644;

/// Writes archives to their destination.
#[derive(Clone, Copy, Debug, Default)]
pub struct Emitter {
    force: bool,
}

impl Emitter {
    /// An emitter that refuses to overwrite existing files unless `force`.
    #[must_use]
    pub const fn new(force: bool) -> Self {
        Self { force }
    }

    /// Whether existing files are replaced.
    #[must_use]
    pub const fn force(&self) -> bool {
        self.force
    }

    /// Fail early when `path` exists and overwriting is not allowed.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DestinationExists`].
    pub fn check_destination(&self, path: &Utf8Path) -> Result<()> {
        if !self.force && fs::symlink_metadata(path).is_ok() {
            return Err(BuildError::DestinationExists {
                path: path.to_owned(),
            });
        }
        Ok(())
    }

    /// Write `bytes` to `path`, marking the file executable when
    /// `executable` is set.
    ///
    /// Parent directories are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DestinationExists`] when the file exists and
    /// `force` is unset, or [`BuildError::Write`] when any I/O step fails.
    pub fn emit(&self, path: &Utf8Path, bytes: &[u8], executable: bool) -> Result<()> {
        self.check_destination(path)?;
        let write_error = |source| BuildError::Write {
            path: path.to_owned(),
            source,
        };

        let parent = parent_dir(path);
        fs::create_dir_all(&parent).map_err(write_error)?;

        let mut temp = NamedTempFile::new_in(&parent).map_err(write_error)?;
        temp.write_all(bytes).map_err(write_error)?;
        temp.as_file().sync_all().map_err(write_error)?;
        set_mode(temp.path(), executable).map_err(write_error)?;

        let persisted = if self.force {
            temp.persist(path)
        } else {
            temp.persist_noclobber(path)
        };
        persisted.map_err(|err| {
            if err.error.kind() == ErrorKind::AlreadyExists {
                BuildError::DestinationExists {
                    path: path.to_owned(),
                }
            } else {
                write_error(err.error)
            }
        })?;

        debug!("wrote {} bytes to {path}", bytes.len());
        info!(
            "emitted {path}{}",
            if executable { " (executable)" } else { "" }
        );
        Ok(())
    }
}

fn parent_dir(path: &Utf8Path) -> Utf8PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_owned(),
        _ => Utf8PathBuf::from("."),
    }
}

#[cfg(unix)]
fn set_mode(path: &std::path::Path, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if executable { EXECUTABLE_MODE } else { PLAIN_MODE };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_path: &std::path::Path, _executable: bool) -> std::io::Result<()> {
    Ok(())
}
