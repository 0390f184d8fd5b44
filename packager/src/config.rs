//! Build configuration files.
//!
//! A project can describe its build in `pyzapp.toml`. Every field is
//! optional; command-line flags override file values one field at a time.
//! Relative paths in the file are resolved against the directory containing
//! it, so a build behaves the same wherever it is started from.

use crate::archive::Compression;
use crate::error::{BuildError, Result};
use crate::rules::Rule;
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;

/// File name looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "pyzapp.toml";

/// Settings read from a configuration file.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Directory whose files are packaged.
    pub root: Option<Utf8PathBuf>,
    /// Archive path of the module the bootstrap runs.
    pub entry_point: Option<String>,
    /// Function called after the entry module is executed.
    pub main_function: Option<String>,
    /// Directory inside the archive that receives the collected files.
    pub archive_base: Option<String>,
    /// Where the archive is written.
    pub output: Option<Utf8PathBuf>,
    /// Second output carrying the shebang; `output` then stays plain.
    pub unix_output: Option<Utf8PathBuf>,
    /// Interpreter for the `#!` line. An empty string disables it.
    pub shebang: Option<String>,
    /// Compression method for entries.
    pub compression: Option<Compression>,
    /// Package symbolic link targets instead of rejecting links.
    pub follow_symlinks: Option<bool>,
    /// Replace existing outputs.
    pub force: Option<bool>,
    /// Interpreter version gate.
    pub python: PythonConfig,
    /// Ordered include and exclude rules.
    pub rules: Vec<Rule>,
}

/// The `[python]` table.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PythonConfig {
    /// Lowest supported version, `X.Y`.
    pub minimum: Option<String>,
    /// Highest supported version, `X.Y`.
    pub maximum: Option<String>,
    /// Treat `maximum` as excluded from the range.
    pub exclusive_maximum: bool,
    /// Replacement for the unsupported-version diagnostic.
    pub message: Option<String>,
}

impl FileConfig {
    /// Parse configuration text. `path` is only used in diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when the text is not valid TOML or
    /// contains unknown keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use camino::Utf8Path;
    /// use pyzapp::config::FileConfig;
    ///
    /// let config = FileConfig::parse("entry_point = \"app/main.py\"", Utf8Path::new("pyzapp.toml"))
    ///     .expect("valid configuration");
    /// assert_eq!(config.entry_point.as_deref(), Some("app/main.py"));
    /// ```
    pub fn parse(text: &str, path: &Utf8Path) -> Result<Self> {
        toml::from_str(text).map_err(|err| BuildError::Config {
            path: path.to_owned(),
            reason: err.message().to_owned(),
        })
    }

    /// Read and parse `path`, resolving relative paths against its
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when the file cannot be read or
    /// parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|err| BuildError::Config {
            path: path.to_owned(),
            reason: err.to_string(),
        })?;
        let mut config = Self::parse(&text, path)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        debug!("loaded configuration from {path}");
        Ok(config)
    }

    /// Load `explicit` when given, otherwise [`DEFAULT_CONFIG_FILE`] in
    /// `working_dir` if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Config`] when an explicitly named file is
    /// missing, or when any file found cannot be read or parsed.
    pub fn discover(explicit: Option<&Utf8Path>, working_dir: &Utf8Path) -> Result<Option<Self>> {
        if let Some(path) = explicit {
            return Self::load(path).map(Some);
        }

        let candidate = working_dir.join(DEFAULT_CONFIG_FILE);
        match fs::metadata(&candidate) {
            Ok(metadata) if metadata.is_file() => Self::load(&candidate).map(Some),
            Ok(_) => Ok(None),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(BuildError::Config {
                path: candidate,
                reason: err.to_string(),
            }),
        }
    }

    /// Make relative filesystem paths relative to `base` instead of the
    /// working directory.
    pub fn resolve_paths(&mut self, base: &Utf8Path) {
        if base.as_str().is_empty() {
            return;
        }
        for path in [&mut self.root, &mut self.output, &mut self.unix_output]
            .into_iter()
            .flatten()
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}
