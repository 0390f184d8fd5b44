//! Extra entries contributed by a dependency source.
//!
//! The archive writer never knows where its entries came from. A
//! [`DependencySource`] is consulted once per build and its entries are
//! merged into the manifest before the bootstrap is added. The default
//! source contributes nothing; resolving third-party packages is left to
//! implementations supplied by the caller.

use crate::error::Result;
use crate::manifest::ManifestEntry;

/// A provider of additional archive entries.
pub trait DependencySource {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Produce the entries to add to the archive.
    ///
    /// # Errors
    ///
    /// Implementations report failures as
    /// [`BuildError::Dependencies`](crate::error::BuildError::Dependencies).
    fn resolve(&self) -> Result<Vec<ManifestEntry>>;
}

/// The default source: no dependencies.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDependencies;

impl DependencySource for NoDependencies {
    fn name(&self) -> &str {
        "none"
    }

    fn resolve(&self) -> Result<Vec<ManifestEntry>> {
        Ok(Vec::new())
    }
}

/// A fixed list of entries, useful for vendored files.
#[derive(Clone, Debug, Default)]
pub struct StaticDependencies {
    entries: Vec<ManifestEntry>,
}

impl StaticDependencies {
    /// Contribute `entries` unchanged.
    #[must_use]
    pub const fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }
}

impl DependencySource for StaticDependencies {
    fn name(&self) -> &str {
        "static"
    }

    fn resolve(&self) -> Result<Vec<ManifestEntry>> {
        Ok(self.entries.clone())
    }
}
