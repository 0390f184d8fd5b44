//! Bootstrap module generation.
//!
//! Every archive starts through `__main__.py`, the module a Python
//! interpreter runs when it is handed a zip file. pyzapp owns that path: the
//! generated module checks the running interpreter against the configured
//! [`VersionConstraint`], prints one friendly line and exits with status 1
//! when the version is unsupported, and otherwise executes the real entry
//! point stored elsewhere in the archive.
//!
//! The generated code sticks to syntax every Python from 2.6 onwards parses,
//! so even an interpreter far outside the range reaches the friendly message
//! rather than a `SyntaxError`. Generation is pure text; nothing here touches
//! the filesystem.

use crate::error::{BuildError, Result};
use crate::manifest::{DEFAULT_MODE, ManifestEntry, validate_archive_path};
use crate::version::{PythonVersion, UpperBound, VersionConstraint};

/// Archive path the interpreter runs first.
pub const BOOTSTRAP_PATH: &str = "__main__.py";

/// The user module the bootstrap hands control to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPoint {
    archive_path: String,
}

impl EntryPoint {
    /// Validate an entry point archive path such as `app/main.py`.
    ///
    /// A missing `.py` suffix is added, so `app/main` names the same module.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidEntryPoint`] when the path is not a valid
    /// archive path or names the reserved bootstrap module.
    ///
    /// # Examples
    ///
    /// ```
    /// use pyzapp::bootstrap::EntryPoint;
    ///
    /// let entry = EntryPoint::new("app/main").expect("valid entry point");
    /// assert_eq!(entry.archive_path(), "app/main.py");
    /// assert_eq!(entry.module_name(), "app.main");
    /// ```
    pub fn new(archive_path: &str) -> Result<Self> {
        let trimmed = archive_path.trim().trim_start_matches("./");
        if trimmed.is_empty() || trimmed == ".py" || trimmed.ends_with("/.py") {
            return Err(BuildError::InvalidEntryPoint {
                path: archive_path.to_owned(),
                reason: "entry point names no module".to_owned(),
            });
        }
        let path = if trimmed.ends_with(".py") {
            trimmed.to_owned()
        } else {
            format!("{trimmed}.py")
        };

        validate_archive_path(&path).map_err(|err| BuildError::InvalidEntryPoint {
            path: archive_path.to_owned(),
            reason: err.to_string(),
        })?;
        if path == BOOTSTRAP_PATH {
            return Err(BuildError::InvalidEntryPoint {
                path: archive_path.to_owned(),
                reason: format!("{BOOTSTRAP_PATH} is reserved for the generated bootstrap"),
            });
        }
        Ok(Self { archive_path: path })
    }

    /// Place the entry point below an archive base directory.
    #[must_use]
    pub fn within(&self, base: Option<&str>) -> Self {
        match base.map(|base| base.trim().trim_matches('/')) {
            Some(base) if !base.is_empty() => Self {
                archive_path: format!("{base}/{}", self.archive_path),
            },
            _ => self.clone(),
        }
    }

    /// Path of the entry module inside the archive.
    #[must_use]
    pub fn archive_path(&self) -> &str {
        &self.archive_path
    }

    /// Dotted module name, with a trailing `__init__` dropped.
    #[must_use]
    pub fn module_name(&self) -> String {
        let stem = self
            .archive_path
            .strip_suffix(".py")
            .unwrap_or(&self.archive_path);
        let stem = stem.strip_suffix("/__init__").unwrap_or(stem);
        stem.replace('/', ".")
    }
}

/// Everything needed to render the bootstrap module.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    entry_point: EntryPoint,
    constraint: Option<VersionConstraint>,
    main_function: Option<String>,
    message: Option<String>,
}

impl Bootstrap {
    /// A bootstrap that runs `entry_point` as `__main__` without a version
    /// check.
    ///
    /// No function is called unless one is named with
    /// [`Bootstrap::with_main_function`]. Projects packaged by tools that call
    /// `main()` implicitly should set `main_function = "main"`.
    #[must_use]
    pub const fn new(entry_point: EntryPoint) -> Self {
        Self {
            entry_point,
            constraint: None,
            main_function: None,
            message: None,
        }
    }

    /// Gate execution on the running interpreter version.
    #[must_use]
    pub const fn with_constraint(mut self, constraint: Option<VersionConstraint>) -> Self {
        self.constraint = constraint;
        self
    }

    /// Call `name()` from the entry module after executing it.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidBootstrapSetting`] unless `name` is a
    /// Python identifier.
    pub fn with_main_function(mut self, name: Option<&str>) -> Result<Self> {
        if let Some(name) = name {
            if !is_identifier(name) {
                return Err(BuildError::InvalidBootstrapSetting {
                    setting: "main_function",
                    reason: format!("`{name}` is not a Python identifier"),
                });
            }
            self.main_function = Some(name.to_owned());
        }
        Ok(self)
    }

    /// Replace the default unsupported-version diagnostic.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidBootstrapSetting`] when the message is
    /// blank or spans more than one line.
    pub fn with_message(mut self, message: Option<&str>) -> Result<Self> {
        if let Some(message) = message {
            let reason = if message.trim().is_empty() {
                Some("message is blank")
            } else if message.contains(['\n', '\r']) {
                Some("message must be a single line")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(BuildError::InvalidBootstrapSetting {
                    setting: "message",
                    reason: reason.to_owned(),
                });
            }
            self.message = Some(message.to_owned());
        }
        Ok(self)
    }

    /// The entry point this bootstrap launches.
    #[must_use]
    pub const fn entry_point(&self) -> &EntryPoint {
        &self.entry_point
    }

    /// Render the Python source of `__main__.py`.
    #[must_use]
    pub fn render(&self) -> String {
        let mut source = String::new();
        source.push_str("# Generated by pyzapp. Do not edit.\n");
        source.push_str("import os\nimport sys\n\n");
        if let Some(constraint) = &self.constraint {
            self.render_version_gate(&mut source, constraint);
        }
        self.render_launch(&mut source);
        source
    }

    /// Render the module as the archive's reserved entry.
    #[must_use]
    pub fn to_entry(&self) -> ManifestEntry {
        ManifestEntry::new(BOOTSTRAP_PATH, self.render().into_bytes()).with_mode(DEFAULT_MODE)
    }

    fn render_version_gate(&self, source: &mut String, constraint: &VersionConstraint) {
        let minimum = constraint.minimum();
        let mut checks = Vec::new();
        if minimum != PythonVersion::ANY {
            checks.push(format!("_version < ({}, {})", minimum.major(), minimum.minor()));
        }
        match constraint.maximum() {
            UpperBound::Unbounded => {}
            UpperBound::Inclusive(max) => {
                checks.push(format!("_version > ({}, {})", max.major(), max.minor()));
            }
            UpperBound::Exclusive(max) => {
                checks.push(format!("_version >= ({}, {})", max.major(), max.minor()));
            }
        }
        if checks.is_empty() {
            return;
        }

        source.push_str("_version = tuple(sys.version_info[:2])\n");
        source.push_str(&format!("if {}:\n", checks.join(" or ")));
        let write_diagnostic = match &self.message {
            Some(message) => format!(
                "    sys.stderr.write({})\n",
                python_string(&format!("{message}\n"))
            ),
            None => {
                let line = format!("Python %d.%d.%d is not supported (requires {constraint})\n");
                format!(
                    "    sys.stderr.write({} % tuple(sys.version_info[:3]))\n",
                    python_string(&line)
                )
            }
        };
        source.push_str(&write_diagnostic);
        source.push_str("    sys.exit(1)\n\n");
    }

    fn render_launch(&self, source: &mut String) {
        let parts = self
            .entry_point
            .archive_path()
            .split('/')
            .map(python_string)
            .collect::<Vec<_>>()
            .join(", ");
        source.push_str(&format!("_entry = os.path.join(os.path.dirname(__file__), {parts})\n"));
        source.push_str("_code = compile(__loader__.get_data(_entry), _entry, \"exec\")\n");

        match &self.main_function {
            None => {
                source.push_str(
                    "_globals = {\"__name__\": \"__main__\", \"__file__\": _entry, \"__builtins__\": __builtins__}\n",
                );
                source.push_str("exec(_code, _globals)\n");
            }
            Some(function) => {
                source.push_str(&format!(
                    "_globals = {{\"__name__\": {}, \"__file__\": _entry, \"__builtins__\": __builtins__}}\n",
                    python_string(&self.entry_point.module_name())
                ));
                source.push_str("exec(_code, _globals)\n");
                source.push_str(&format!("_globals[{}]()\n", python_string(function)));
            }
        }
    }
}

/// Whether `name` is an ASCII Python identifier.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|first| first == '_' || first.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// Quote `text` as a double-quoted Python string literal.
///
/// Everything outside printable ASCII is escaped, so the generated module
/// needs no encoding declaration.
fn python_string(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            ' '..='~' => literal.push(c),
            c if u32::from(c) <= 0xFFFF => {
                literal.push_str(&format!("\\u{:04x}", u32::from(c)));
            }
            c => literal.push_str(&format!("\\U{:08x}", u32::from(c))),
        }
    }
    literal.push('"');
    literal
}

#[cfg(test)]
#[path = "bootstrap_tests.rs"]
mod tests;
