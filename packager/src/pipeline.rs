//! The build pipeline.
//!
//! A build runs in a fixed order: validate the request, check destinations,
//! collect the manifest, merge dependency entries, assemble the layout
//! around the generated bootstrap, serialise every output in memory, and
//! only then write files. Any failure before the final step leaves the
//! filesystem untouched.

use crate::archive::{ArchiveLimits, ArchiveWriter, Compression};
use crate::bootstrap::{Bootstrap, EntryPoint};
use crate::deps::{DependencySource, NoDependencies};
use crate::emit::Emitter;
use crate::error::{BuildError, ManifestError, Result};
use crate::layout::{ArchiveLayout, BuildWarning};
use crate::manifest::{self, CollectOptions, Manifest};
use crate::prefix::{ComposedArchive, Prefix, compose};
use crate::rules::Rule;
use crate::version::VersionConstraint;
use camino::Utf8PathBuf;
use log::{debug, info};

/// Everything a build needs, already merged from flags and configuration.
#[derive(Clone, Debug)]
pub struct BuildRequest {
    /// Directory whose files are packaged.
    pub root: Utf8PathBuf,
    /// Entry point archive path, relative to `archive_base`.
    pub entry_point: String,
    /// Function to call after executing the entry module.
    pub main_function: Option<String>,
    /// Directory inside the archive that receives the collected files.
    pub archive_base: Option<String>,
    /// Ordered include and exclude rules.
    pub rules: Vec<Rule>,
    /// Package symbolic link targets.
    pub follow_symlinks: bool,
    /// Interpreter versions the bootstrap accepts.
    pub constraint: Option<VersionConstraint>,
    /// Replacement for the unsupported-version diagnostic.
    pub message: Option<String>,
    /// Primary output path.
    pub output: Utf8PathBuf,
    /// Optional executable output. When set, `output` is written without a
    /// prefix and `prefix` goes on this file instead.
    pub unix_output: Option<Utf8PathBuf>,
    /// Bytes placed before the archive.
    pub prefix: Prefix,
    /// Requested compression method.
    pub compression: Compression,
    /// Archive size limits.
    pub limits: ArchiveLimits,
    /// Replace existing outputs.
    pub force: bool,
    /// Build everything in memory but write nothing.
    pub dry_run: bool,
}

impl BuildRequest {
    /// A request with default settings: `include *.py`, deflate, no prefix,
    /// no version gate.
    #[must_use]
    pub fn new(
        root: impl Into<Utf8PathBuf>,
        entry_point: impl Into<String>,
        output: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            root: root.into(),
            entry_point: entry_point.into(),
            main_function: None,
            archive_base: None,
            rules: Vec::new(),
            follow_symlinks: false,
            constraint: None,
            message: None,
            output: output.into(),
            unix_output: None,
            prefix: Prefix::none(),
            compression: Compression::default(),
            limits: ArchiveLimits::default(),
            force: false,
            dry_run: false,
        }
    }

    /// The files to produce and the prefix each one carries.
    #[must_use]
    pub fn outputs(&self) -> Vec<(Utf8PathBuf, Prefix)> {
        match &self.unix_output {
            Some(unix_output) => vec![
                (self.output.clone(), Prefix::none()),
                (unix_output.clone(), self.prefix.clone()),
            ],
            None => vec![(self.output.clone(), self.prefix.clone())],
        }
    }

    fn bootstrap(&self) -> Result<Bootstrap> {
        let entry_point =
            EntryPoint::new(&self.entry_point)?.within(self.archive_base.as_deref());
        Bootstrap::new(entry_point)
            .with_constraint(self.constraint)
            .with_main_function(self.main_function.as_deref())?
            .with_message(self.message.as_deref())
    }

    fn collect_options(&self) -> CollectOptions {
        CollectOptions {
            rules: self.rules.clone(),
            archive_base: self.archive_base.clone(),
            follow_symlinks: self.follow_symlinks,
        }
    }
}

/// One entry of the produced archive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackagedEntry {
    /// Path inside the archive.
    pub archive_path: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Compression method used.
    pub method: Compression,
}

/// One file produced by the build.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputFile {
    /// Where the file was (or, in a dry run, would be) written.
    pub path: Utf8PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Whether the file starts with a prefix and is marked executable.
    pub executable: bool,
}

/// What a build produced.
#[derive(Clone, Debug)]
pub struct BuildReport {
    /// Archive entries in order, bootstrap first.
    pub entries: Vec<PackagedEntry>,
    /// Output files in the order they were written.
    pub outputs: Vec<OutputFile>,
    /// Non-fatal conditions raised during the build.
    pub warnings: Vec<BuildWarning>,
    /// Whether writing was skipped.
    pub dry_run: bool,
}

impl BuildReport {
    /// Number of archive entries, including the bootstrap.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

/// Collect the manifest for `request` and merge in dependency entries.
///
/// # Errors
///
/// Returns [`ManifestError::NothingToPackage`] when the rules select no
/// files, any other [`ManifestError`] raised by collection, or the
/// dependency source's error.
pub fn collect_manifest(
    request: &BuildRequest,
    dependencies: &dyn DependencySource,
) -> Result<Manifest> {
    let mut collected = manifest::collect(&request.root, &request.collect_options())?;
    if collected.is_empty() {
        return Err(ManifestError::NothingToPackage {
            root: request.root.clone(),
        }
        .into());
    }

    let extra = dependencies.resolve()?;
    if !extra.is_empty() {
        debug!(
            "dependency source `{}` contributed {} file(s)",
            dependencies.name(),
            extra.len()
        );
        collected.extend(extra)?;
    }
    Ok(collected)
}

/// Run a build without dependency bundling.
///
/// # Errors
///
/// See [`build_with`].
pub fn build(request: &BuildRequest) -> Result<BuildReport> {
    build_with(request, &NoDependencies)
}

/// Run a build, merging entries from `dependencies` into the manifest.
///
/// # Errors
///
/// Returns the first [`BuildError`] encountered, starting with
/// [`BuildError::OutputsCollide`] when both outputs name the same file.
/// Nothing is written unless every output was serialised successfully.
pub fn build_with(
    request: &BuildRequest,
    dependencies: &dyn DependencySource,
) -> Result<BuildReport> {
    if request.unix_output.as_ref() == Some(&request.output) {
        return Err(BuildError::OutputsCollide {
            path: request.output.clone(),
        });
    }
    let bootstrap = request.bootstrap()?;
    let emitter = Emitter::new(request.force);
    let outputs = request.outputs();
    if !request.dry_run {
        for (path, _) in &outputs {
            emitter.check_destination(path)?;
        }
    }

    let manifest = collect_manifest(request, dependencies)?;
    info!("collected {} file(s) from {}", manifest.len(), request.root);

    let assembled = ArchiveLayout::assemble(manifest, &bootstrap)?;
    let mut layout = assembled.layout;
    let writer = ArchiveWriter::new(request.compression).with_limits(request.limits);

    let mut composed: Vec<(Utf8PathBuf, ComposedArchive)> = Vec::with_capacity(outputs.len());
    for (path, prefix) in outputs {
        layout.set_prefix(prefix);
        let archive = compose(&layout, &writer)?;
        composed.push((path, archive));
    }

    let entries: Vec<PackagedEntry> = composed
        .first()
        .map(|(_, archive)| {
            archive
                .records()
                .iter()
                .map(|record| PackagedEntry {
                    archive_path: record.archive_path.clone(),
                    size: record.uncompressed_size,
                    method: record.method,
                })
                .collect()
        })
        .unwrap_or_default();

    let mut files = Vec::with_capacity(composed.len());
    for (path, archive) in composed {
        let executable = archive.has_prefix();
        if request.dry_run {
            debug!("dry run: skipping write of {path}");
        } else {
            emitter.emit(&path, archive.bytes(), executable)?;
        }
        files.push(OutputFile {
            path,
            size: archive.bytes().len() as u64,
            executable,
        });
    }

    Ok(BuildReport {
        entries,
        outputs: files,
        warnings: assembled.warnings,
        dry_run: request.dry_run,
    })
}

/// Assemble and compose `manifest` without touching the filesystem.
///
/// # Errors
///
/// Returns [`ManifestError::EmptyManifest`],
/// [`ManifestError::EntryPointMissing`], or an archive size error.
pub fn assemble_bytes(
    manifest: Manifest,
    bootstrap: &Bootstrap,
    prefix: Prefix,
    writer: &ArchiveWriter,
) -> Result<(ComposedArchive, Vec<BuildWarning>)> {
    let assembled = ArchiveLayout::assemble(manifest, bootstrap)?;
    let layout = assembled.layout.with_prefix(prefix);
    Ok((compose(&layout, writer)?, assembled.warnings))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
