//! Test support utilities for pyzapp behavioural tests.
//!
//! This module provides scratch source trees, archive inspection through the
//! `zip` crate, and detection of a local Python interpreter for the runtime
//! scenarios.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io::Cursor;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A temporary project with a `src/` tree and a `dist/` output directory.
pub struct ScratchProject {
    _temp: TempDir,
    base: Utf8PathBuf,
}

impl ScratchProject {
    /// Create an empty project.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let base = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
            .expect("temp dir should be UTF-8");
        fs::create_dir_all(base.join("src")).expect("failed to create src dir");
        Self { _temp: temp, base }
    }

    /// The project directory.
    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    /// The source root.
    pub fn root(&self) -> Utf8PathBuf {
        self.base.join("src")
    }

    /// A path below `dist/`.
    pub fn output(&self, name: &str) -> Utf8PathBuf {
        self.base.join("dist").join(name)
    }

    /// Write a source file relative to the source root.
    pub fn write_source(&self, path: &str, contents: &str) {
        let full = self.root().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).expect("failed to create source dir");
        }
        fs::write(full, contents).expect("failed to write source file");
    }
}

/// Names of the entries in an archive, in central directory order.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("archive should open");
    archive.file_names().map(str::to_owned).collect()
}

/// Read one entry's contents.
pub fn entry_contents(bytes: &[u8], name: &str) -> Vec<u8> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("archive should open");
    let mut file = archive.by_name(name).expect("entry should exist");
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)
        .expect("entry should decompress");
    contents
}

/// Whether `python3` can be started.
pub fn python3_available() -> bool {
    Command::new("python3")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run an archive with `python3`.
pub fn run_with_python(archive: &Utf8Path) -> Output {
    Command::new("python3")
        .arg(archive)
        .output()
        .expect("failed to run python3")
}
