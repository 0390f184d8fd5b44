//! CLI argument definitions for pyzapp.
//!
//! This module defines the command-line interface using clap and merges the
//! parsed flags with an optional configuration file into a
//! [`BuildRequest`]. Include and exclude flags may be interleaved; their
//! relative order on the command line becomes the rule order.

use crate::archive::Compression;
use crate::config::FileConfig;
use crate::error::{BuildError, Result};
use crate::pipeline::BuildRequest;
use crate::prefix::Prefix;
use crate::rules::Rule;
use crate::version::VersionConstraint;
use camino::Utf8PathBuf;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use log::LevelFilter;
use std::ffi::OsString;

/// Package a Python source tree into a self-executing zip application.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "pyzapp")]
#[command(version, about)]
#[command(long_about = concat!(
    "Package a Python source tree into a self-executing zip application.\n\n",
    "Files under ROOT are selected by ordered include and exclude rules (the last ",
    "matching rule wins; with no rules, every *.py file is included). A generated ",
    "__main__.py checks the interpreter version and then runs the entry point.\n\n",
    "Settings are read from pyzapp.toml in the working directory, or from --config, ",
    "and command-line flags override them.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Package src/ with app/main.py as the entry point:\n",
    "    $ pyzapp src -e app/main.py -o dist/app.pyz\n\n",
    "  Leave the tests out and require Python 3.8 to 3.12:\n",
    "    $ pyzapp src -e app/main.py -o dist/app.pyz -x 'tests/' \\\n",
    "        --min-python 3.8 --max-python 3.12\n\n",
    "  Produce an executable with a shebang line:\n",
    "    $ pyzapp src -e app/main.py -o dist/app --shebang\n\n",
    "  List what would be packaged:\n",
    "    $ pyzapp src -e app/main.py -o dist/app.pyz --dry-run",
))]
pub struct Cli {
    /// Directory containing the sources to package [default: .].
    #[arg(value_name = "ROOT")]
    pub root: Option<Utf8PathBuf>,

    /// Configuration file [default: pyzapp.toml when present].
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Archive path of the module to run, e.g. app/main.py.
    #[arg(short, long, value_name = "PATH")]
    pub entry_point: Option<String>,

    /// Function to call after running the entry module.
    #[arg(short, long, value_name = "NAME")]
    pub main_function: Option<String>,

    /// Output archive path.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,

    /// Also write an executable copy with a shebang line here.
    #[arg(long, value_name = "PATH")]
    pub unix_output: Option<Utf8PathBuf>,

    /// Include files matching GLOB (repeatable, ordered with --exclude).
    #[arg(short, long, value_name = "GLOB")]
    pub include: Vec<String>,

    /// Exclude files matching GLOB (repeatable, ordered with --include).
    #[arg(short = 'x', long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Prepend a shebang line [default interpreter: /usr/bin/env python3].
    #[arg(
        long,
        value_name = "INTERP",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "",
        conflicts_with = "no_shebang"
    )]
    pub shebang: Option<String>,

    /// Never prepend a shebang line.
    #[arg(long)]
    pub no_shebang: bool,

    /// Lowest supported Python version, X.Y.
    #[arg(long, value_name = "X.Y")]
    pub min_python: Option<String>,

    /// Highest supported Python version, X.Y.
    #[arg(long, value_name = "X.Y")]
    pub max_python: Option<String>,

    /// Treat --max-python as excluded from the supported range.
    #[arg(long)]
    pub exclusive_max: bool,

    /// Compression method for archive entries [default: deflated].
    #[arg(long, value_enum)]
    pub compression: Option<Compression>,

    /// Directory inside the archive that receives the sources.
    #[arg(long, value_name = "DIR")]
    pub archive_base: Option<String>,

    /// Package the targets of symbolic links instead of rejecting them.
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Overwrite existing outputs.
    #[arg(short, long)]
    pub force: bool,

    /// List the files that would be packaged without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only report errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Include and exclude rules in command-line order.
    #[arg(skip)]
    pub rules: Vec<Rule>,
}

impl Cli {
    /// Parse the process arguments, exiting with a usage message on error.
    #[must_use]
    pub fn parse_ordered() -> Self {
        let matches = Self::command().get_matches();
        Self::from_matches(&matches).unwrap_or_else(|err| err.exit())
    }

    /// Parse `args`, keeping the interleaved order of include and exclude
    /// flags.
    ///
    /// # Errors
    ///
    /// Returns the clap error for invalid arguments.
    pub fn try_parse_ordered<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> std::result::Result<Self, clap::Error> {
        let mut cli = Self::from_arg_matches(matches)?;
        cli.rules = ordered_rules(matches);
        Ok(cli)
    }

    /// Log level selected by `-v` and `-q`.
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Merge the flags over `file` into a build request.
    ///
    /// File rules come first and command-line rules are appended, so a flag
    /// can override any rule from the file.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::MissingSetting`] when no entry point or output
    /// is configured, or the error for an invalid version bound or shebang.
    pub fn build_request(&self, file: Option<FileConfig>) -> Result<BuildRequest> {
        let file = file.unwrap_or_default();

        let entry_point = self
            .entry_point
            .clone()
            .or(file.entry_point)
            .ok_or(BuildError::MissingSetting {
                name: "entry_point",
            })?;
        let output = self
            .output
            .clone()
            .or(file.output)
            .ok_or(BuildError::MissingSetting { name: "output" })?;
        let root = self
            .root
            .clone()
            .or(file.root)
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        let unix_output = self.unix_output.clone().or(file.unix_output);

        let constraint = VersionConstraint::from_bounds(
            self.min_python
                .as_deref()
                .or(file.python.minimum.as_deref()),
            self.max_python
                .as_deref()
                .or(file.python.maximum.as_deref()),
            self.exclusive_max || file.python.exclusive_maximum,
        )?;
        let prefix = self.prefix(file.shebang.as_deref(), unix_output.is_some())?;

        let mut rules = file.rules;
        rules.extend(self.rules.iter().cloned());

        let mut request = BuildRequest::new(root, entry_point, output);
        request.main_function = self.main_function.clone().or(file.main_function);
        request.archive_base = self.archive_base.clone().or(file.archive_base);
        request.rules = rules;
        request.follow_symlinks = self.follow_symlinks || file.follow_symlinks.unwrap_or(false);
        request.constraint = constraint;
        request.message = file.python.message;
        request.unix_output = unix_output;
        request.prefix = prefix;
        request.compression = self.compression.or(file.compression).unwrap_or_default();
        request.force = self.force || file.force.unwrap_or(false);
        request.dry_run = self.dry_run;
        Ok(request)
    }

    /// Resolve the prefix from the flags, the file's `shebang`, and whether
    /// a separate executable output was requested.
    fn prefix(&self, file_shebang: Option<&str>, has_unix_output: bool) -> Result<Prefix> {
        if self.no_shebang {
            return Ok(Prefix::none());
        }
        if let Some(interpreter) = &self.shebang {
            return Prefix::shebang(Some(interpreter));
        }
        match file_shebang {
            Some(interpreter) if interpreter.trim().is_empty() => Ok(Prefix::none()),
            Some(interpreter) => Prefix::shebang(Some(interpreter)),
            None if has_unix_output => Prefix::shebang(None),
            None => Ok(Prefix::none()),
        }
    }
}

/// Rebuild the include and exclude rules in the order they were given.
fn ordered_rules(matches: &ArgMatches) -> Vec<Rule> {
    let mut indexed: Vec<(usize, Rule)> = Vec::new();
    for (id, make) in [
        ("include", Rule::Include as fn(String) -> Rule),
        ("exclude", Rule::Exclude),
    ] {
        let (Some(indices), Some(values)) =
            (matches.indices_of(id), matches.get_many::<String>(id))
        else {
            continue;
        };
        for (index, value) in indices.zip(values) {
            indexed.push((index, make(value.clone())));
        }
    }
    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, rule)| rule).collect()
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
