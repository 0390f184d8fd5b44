//! Tests for CLI parsing and request merging.

use super::*;
use crate::config::PythonConfig;
use crate::version::{PythonVersion, UpperBound};
use rstest::rstest;

fn parse(args: &[&str]) -> Cli {
    let mut full = vec!["pyzapp"];
    full.extend_from_slice(args);
    Cli::try_parse_ordered(full).expect("valid arguments")
}

fn minimal() -> Cli {
    parse(&["-e", "app/main.py", "-o", "dist/app.pyz"])
}

#[test]
fn cli_parses_defaults() {
    let cli = parse(&[]);
    assert!(cli.root.is_none());
    assert!(cli.config.is_none());
    assert!(cli.entry_point.is_none());
    assert!(cli.output.is_none());
    assert!(cli.shebang.is_none());
    assert!(!cli.no_shebang);
    assert!(cli.compression.is_none());
    assert!(!cli.force);
    assert!(!cli.dry_run);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
    assert!(cli.rules.is_empty());
}

#[test]
fn cli_parses_root_and_paths() {
    let cli = parse(&[
        "src",
        "-e",
        "app/main.py",
        "-o",
        "dist/app.pyz",
        "--unix-output",
        "dist/app",
    ]);
    assert_eq!(cli.root, Some(Utf8PathBuf::from("src")));
    assert_eq!(cli.entry_point.as_deref(), Some("app/main.py"));
    assert_eq!(cli.output, Some(Utf8PathBuf::from("dist/app.pyz")));
    assert_eq!(cli.unix_output, Some(Utf8PathBuf::from("dist/app")));
}

#[test]
fn interleaved_rules_keep_their_order() {
    let cli = parse(&[
        "-i",
        "*.py",
        "-x",
        "tests/",
        "-i",
        "tests/fixtures/*.py",
        "--exclude",
        "*_gen.py",
    ]);
    assert_eq!(
        cli.rules,
        vec![
            Rule::include("*.py"),
            Rule::exclude("tests/"),
            Rule::include("tests/fixtures/*.py"),
            Rule::exclude("*_gen.py"),
        ]
    );
}

#[rstest]
#[case::bare_flag(&["--shebang"], Some(""))]
#[case::with_interpreter(&["--shebang=/usr/bin/python3"], Some("/usr/bin/python3"))]
#[case::absent(&[], None)]
fn shebang_flag_takes_an_optional_value(#[case] args: &[&str], #[case] expected: Option<&str>) {
    assert_eq!(parse(args).shebang.as_deref(), expected);
}

#[test]
fn shebang_without_equals_leaves_the_next_word_alone() {
    let cli = parse(&["--shebang", "src"]);
    assert_eq!(cli.shebang.as_deref(), Some(""));
    assert_eq!(cli.root, Some(Utf8PathBuf::from("src")));
}

#[test]
fn shebang_conflicts_with_no_shebang() {
    let result = Cli::try_parse_ordered(["pyzapp", "--shebang", "--no-shebang"]);
    assert!(result.is_err());
}

#[test]
fn quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_ordered(["pyzapp", "-q", "-v"]);
    assert!(result.is_err());
}

#[test]
fn compression_values_are_parsed() {
    assert_eq!(
        parse(&["--compression", "stored"]).compression,
        Some(Compression::Stored)
    );
    assert!(Cli::try_parse_ordered(["pyzapp", "--compression", "zstd"]).is_err());
}

#[rstest]
#[case::default(&[], LevelFilter::Warn)]
#[case::verbose(&["-v"], LevelFilter::Info)]
#[case::very_verbose(&["-vv"], LevelFilter::Debug)]
#[case::trace(&["-vvv"], LevelFilter::Trace)]
#[case::quiet(&["-q"], LevelFilter::Error)]
fn log_level_follows_verbosity(#[case] args: &[&str], #[case] expected: LevelFilter) {
    assert_eq!(parse(args).log_level(), expected);
}

#[test]
fn request_from_flags_alone() {
    let request = minimal().build_request(None).expect("request");
    assert_eq!(request.root, Utf8PathBuf::from("."));
    assert_eq!(request.entry_point, "app/main.py");
    assert_eq!(request.output, Utf8PathBuf::from("dist/app.pyz"));
    assert!(request.rules.is_empty());
    assert!(request.constraint.is_none());
    assert!(request.prefix.is_empty());
    assert_eq!(request.compression, Compression::Deflated);
    assert!(!request.force);
}

#[rstest]
#[case::entry_point(&["-o", "dist/app.pyz"], "entry_point")]
#[case::output(&["-e", "app/main.py"], "output")]
fn missing_settings_are_named(#[case] args: &[&str], #[case] missing: &str) {
    let err = parse(args)
        .build_request(None)
        .expect_err("missing setting");
    assert!(matches!(err, BuildError::MissingSetting { name } if name == missing));
}

#[test]
fn flags_override_the_file() {
    let file = FileConfig {
        root: Some(Utf8PathBuf::from("project/src")),
        entry_point: Some("tool/cli.py".to_owned()),
        output: Some(Utf8PathBuf::from("project/dist/tool.pyz")),
        compression: Some(Compression::Stored),
        main_function: Some("run".to_owned()),
        ..FileConfig::default()
    };
    let cli = parse(&["-e", "app/main.py", "--compression", "deflated"]);

    let request = cli.build_request(Some(file)).expect("request");
    assert_eq!(request.entry_point, "app/main.py");
    assert_eq!(request.root, Utf8PathBuf::from("project/src"));
    assert_eq!(request.output, Utf8PathBuf::from("project/dist/tool.pyz"));
    assert_eq!(request.compression, Compression::Deflated);
    assert_eq!(request.main_function.as_deref(), Some("run"));
}

#[test]
fn command_line_rules_follow_file_rules() {
    let file = FileConfig {
        rules: vec![Rule::include("*.py"), Rule::exclude("tests/")],
        ..FileConfig::default()
    };
    let cli = parse(&[
        "-e",
        "app/main.py",
        "-o",
        "app.pyz",
        "-i",
        "tests/conftest.py",
    ]);

    let request = cli.build_request(Some(file)).expect("request");
    assert_eq!(
        request.rules,
        vec![
            Rule::include("*.py"),
            Rule::exclude("tests/"),
            Rule::include("tests/conftest.py"),
        ]
    );
}

#[test]
fn file_booleans_cannot_be_switched_off_by_absent_flags() {
    let file = FileConfig {
        force: Some(true),
        follow_symlinks: Some(true),
        ..FileConfig::default()
    };
    let request = minimal().build_request(Some(file)).expect("request");
    assert!(request.force);
    assert!(request.follow_symlinks);
}

#[rstest]
#[case::no_shebang_anywhere(&[], None, false, b"".as_slice())]
#[case::bare_flag(&["--shebang"], None, false, b"#!/usr/bin/env python3\n".as_slice())]
#[case::flag_interpreter(&["--shebang=/opt/py/bin/python"], None, false, b"#!/opt/py/bin/python\n".as_slice())]
#[case::file_interpreter(&[], Some("/usr/bin/python3"), false, b"#!/usr/bin/python3\n".as_slice())]
#[case::blank_file_value(&[], Some(""), true, b"".as_slice())]
#[case::unix_output_default(&[], None, true, b"#!/usr/bin/env python3\n".as_slice())]
#[case::flag_beats_file(&["--shebang=/bin/py"], Some("/usr/bin/python3"), false, b"#!/bin/py\n".as_slice())]
#[case::no_shebang_beats_file(&["--no-shebang"], Some("/usr/bin/python3"), true, b"".as_slice())]
fn prefix_is_resolved_from_flags_and_file(
    #[case] flags: &[&str],
    #[case] file_shebang: Option<&str>,
    #[case] unix_output: bool,
    #[case] expected: &[u8],
) {
    let mut args = vec!["-e", "app/main.py", "-o", "app.pyz"];
    args.extend_from_slice(flags);
    let file = FileConfig {
        shebang: file_shebang.map(str::to_owned),
        unix_output: unix_output.then(|| Utf8PathBuf::from("app")),
        ..FileConfig::default()
    };

    let request = parse(&args).build_request(Some(file)).expect("request");
    assert_eq!(request.prefix.as_bytes(), expected);
}

#[test]
fn version_bounds_merge_per_field() {
    let file = FileConfig {
        python: PythonConfig {
            minimum: Some("3.6".to_owned()),
            maximum: Some("4.0".to_owned()),
            exclusive_maximum: true,
            message: Some("Use the bundled interpreter.".to_owned()),
        },
        ..FileConfig::default()
    };
    let cli = parse(&[
        "-e",
        "app/main.py",
        "-o",
        "app.pyz",
        "--min-python",
        "3.8",
    ]);

    let request = cli.build_request(Some(file)).expect("request");
    let constraint = request.constraint.expect("constraint");
    assert_eq!(constraint.minimum(), PythonVersion::new(3, 8));
    assert_eq!(
        constraint.maximum(),
        UpperBound::Exclusive(PythonVersion::new(4, 0))
    );
    assert_eq!(
        request.message.as_deref(),
        Some("Use the bundled interpreter.")
    );
}

#[rstest]
#[case::malformed(&["--min-python", "three"])]
#[case::inverted(&["--min-python", "3.12", "--max-python", "3.8"])]
fn bad_version_bounds_are_rejected(#[case] flags: &[&str]) {
    let mut args = vec!["-e", "app/main.py", "-o", "app.pyz"];
    args.extend_from_slice(flags);
    let err = parse(&args)
        .build_request(None)
        .expect_err("invalid bounds");
    assert!(matches!(err, BuildError::InvalidVersionConstraint { .. }));
}

#[test]
fn dry_run_is_carried_over() {
    let request = parse(&["-e", "app/main.py", "-o", "app.pyz", "--dry-run"])
        .build_request(None)
        .expect("request");
    assert!(request.dry_run);
}
