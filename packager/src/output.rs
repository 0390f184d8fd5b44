//! Output formatting for the pyzapp CLI.
//!
//! Everything the binary reports goes to stderr; these helpers only build
//! the text so it can be tested without a terminal.

use crate::pipeline::{BuildReport, OutputFile};

/// Format a success message for one written output.
///
/// # Example
///
/// ```
/// use camino::Utf8PathBuf;
/// use pyzapp::output::success_message;
/// use pyzapp::pipeline::OutputFile;
///
/// let output = OutputFile {
///     path: Utf8PathBuf::from("dist/app.pyz"),
///     size: 1024,
///     executable: false,
/// };
/// assert_eq!(
///     success_message(3, &output),
///     "Packaged 3 files into dist/app.pyz (1024 bytes)"
/// );
/// ```
#[must_use]
pub fn success_message(count: usize, output: &OutputFile) -> String {
    let plural = if count == 1 { "file" } else { "files" };
    format!(
        "Packaged {count} {plural} into {} ({} bytes)",
        output.path, output.size
    )
}

/// One success line per output file.
#[must_use]
pub fn success_lines(report: &BuildReport) -> Vec<String> {
    report
        .outputs
        .iter()
        .map(|output| success_message(report.entry_count(), output))
        .collect()
}

/// Describe what a dry run would have written.
#[must_use]
pub fn dry_run_text(report: &BuildReport) -> String {
    let mut lines = vec![
        "Dry run - no files will be written".to_owned(),
        String::new(),
        "Archive entries:".to_owned(),
    ];
    for entry in &report.entries {
        lines.push(format!(
            "  {} ({} bytes, {})",
            entry.archive_path, entry.size, entry.method
        ));
    }

    lines.push(String::new());
    lines.push("Outputs:".to_owned());
    for output in &report.outputs {
        let kind = if output.executable {
            "executable"
        } else {
            "archive"
        };
        lines.push(format!("  {} ({} bytes, {kind})", output.path, output.size));
    }

    lines.join("\n")
}
