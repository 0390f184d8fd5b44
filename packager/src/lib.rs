//! pyzapp library.
//!
//! This crate packages a Python source tree into a single self-executing zip
//! application: a generated `__main__.py` checks the interpreter version and
//! runs the configured entry point, and the archive may sit behind a shebang
//! line so the file can be executed directly. It is used by the `pyzapp` CLI
//! binary and can be driven programmatically through [`pipeline::build`].
//!
//! # Modules
//!
//! - [`archive`] - Zip serialisation with absolute offsets and per-entry compression
//! - [`bootstrap`] - Generated `__main__.py` with the interpreter version gate
//! - [`cli`] - Command-line argument definitions and request merging
//! - [`config`] - `pyzapp.toml` loading
//! - [`deps`] - Pluggable sources of additional archive entries
//! - [`emit`] - Atomic output writing and executable permissions
//! - [`error`] - Semantic error types
//! - [`layout`] - Placement of the bootstrap ahead of the collected files
//! - [`manifest`] - Source tree collection
//! - [`output`] - Success and dry-run message formatting
//! - [`pipeline`] - Build orchestration
//! - [`prefix`] - Shebang prefixes and archive composition
//! - [`rules`] - Ordered include and exclude rules
//! - [`version`] - Python versions and supported ranges

pub mod archive;
pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod deps;
pub mod emit;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod output;
pub mod pipeline;
pub mod prefix;
pub mod rules;
pub mod version;
