//! Archive layout assembly.
//!
//! [`ArchiveLayout::assemble`] combines the collected manifest with the
//! generated bootstrap. The bootstrap always occupies [`BOOTSTRAP_PATH`] and
//! comes first; a user file at that path is dropped with a warning.

use crate::bootstrap::{BOOTSTRAP_PATH, Bootstrap};
use crate::error::ManifestError;
use crate::manifest::{Manifest, ManifestEntry};
use crate::prefix::Prefix;
use log::warn;
use std::fmt;

/// A non-fatal condition noticed during a build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BuildWarning {
    /// A collected file at the bootstrap path was replaced by the generated
    /// module.
    BootstrapOverridden {
        /// The archive path that was overridden.
        path: String,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BootstrapOverridden { path } => write!(
                f,
                "{path} in the source tree is replaced by the generated bootstrap"
            ),
        }
    }
}

/// The ordered entries of an archive and the prefix placed before it.
#[derive(Clone, Debug, Default)]
pub struct ArchiveLayout {
    entries: Vec<ManifestEntry>,
    prefix: Prefix,
}

/// An assembled layout plus the warnings raised while assembling it.
#[derive(Debug)]
pub struct Assembled {
    /// The layout, without a prefix.
    pub layout: ArchiveLayout,
    /// Warnings to report to the user.
    pub warnings: Vec<BuildWarning>,
}

impl ArchiveLayout {
    /// Place the bootstrap first, followed by the manifest in order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::EmptyManifest`] when no user files remain and
    /// [`ManifestError::EntryPointMissing`] when the bootstrap's entry point
    /// is not part of the manifest.
    pub fn assemble(
        mut manifest: Manifest,
        bootstrap: &Bootstrap,
    ) -> Result<Assembled, ManifestError> {
        let mut warnings = Vec::new();
        if manifest.remove(BOOTSTRAP_PATH).is_some() {
            let warning = BuildWarning::BootstrapOverridden {
                path: BOOTSTRAP_PATH.to_owned(),
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        if manifest.is_empty() {
            return Err(ManifestError::EmptyManifest);
        }

        let entry_point = bootstrap.entry_point().archive_path();
        if !manifest.contains(entry_point) {
            return Err(ManifestError::EntryPointMissing {
                path: entry_point.to_owned(),
            });
        }

        let mut entries = Vec::with_capacity(manifest.len() + 1);
        entries.push(bootstrap.to_entry());
        entries.extend(manifest.into_entries());
        Ok(Assembled {
            layout: Self {
                entries,
                prefix: Prefix::none(),
            },
            warnings,
        })
    }

    /// Replace the prefix.
    pub fn set_prefix(&mut self, prefix: Prefix) {
        self.prefix = prefix;
    }

    /// The same layout behind `prefix`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: Prefix) -> Self {
        self.set_prefix(prefix);
        self
    }

    /// Entries in archive order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// The prefix.
    #[must_use]
    pub const fn prefix(&self) -> &Prefix {
        &self.prefix
    }
}
