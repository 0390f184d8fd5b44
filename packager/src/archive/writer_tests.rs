//! Unit tests for the zip writer. Archives are read back with the `zip`
//! crate as an independent reader.

use super::*;
use rstest::{fixture, rstest};
use std::io::{Cursor, Read};

#[fixture]
fn entries() -> Vec<ManifestEntry> {
    vec![
        ManifestEntry::new("__main__.py", b"import app\n".to_vec()),
        ManifestEntry::new("app/main.py", b"print('hi')\n".repeat(40)),
        ManifestEntry::new("app/run.sh", b"#!/bin/sh\n".to_vec()).with_mode(0o755),
    ]
}

fn read_back(bytes: &[u8]) -> Vec<(String, Vec<u8>, Option<u32>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).expect("entry readable");
            let mut payload = Vec::new();
            file.read_to_end(&mut payload).expect("payload readable");
            (file.name().to_owned(), payload, file.unix_mode())
        })
        .collect()
}

fn u16_at(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn u32_at(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(
        bytes[offset..offset + 4]
            .try_into()
            .expect("four bytes available"),
    )
}

#[rstest]
#[case::stored(Compression::Stored)]
#[case::deflated(Compression::Deflated)]
fn entries_round_trip_through_a_standard_reader(
    entries: Vec<ManifestEntry>,
    #[case] compression: Compression,
) {
    let written = ArchiveWriter::new(compression)
        .write(&entries)
        .expect("write archive");

    let read = read_back(written.bytes());
    let expected: Vec<_> = entries
        .iter()
        .map(|entry| {
            (
                entry.archive_path().to_owned(),
                entry.payload().to_vec(),
                Some(S_IFREG | entry.mode()),
            )
        })
        .collect();
    assert_eq!(read, expected);
}

#[rstest]
fn deflate_falls_back_per_entry(entries: Vec<ManifestEntry>) {
    let written = ArchiveWriter::new(Compression::Deflated)
        .write(&entries)
        .expect("write archive");

    let methods: Vec<_> = written
        .records()
        .iter()
        .map(|record| record.method)
        .collect();
    assert_eq!(
        methods,
        vec![
            Compression::Stored,
            Compression::Deflated,
            Compression::Stored,
        ]
    );
}

#[rstest]
fn offsets_start_at_the_base(entries: Vec<ManifestEntry>) {
    let plain = ArchiveWriter::new(Compression::Stored)
        .write(&entries)
        .expect("write archive");
    let shifted = ArchiveWriter::new(Compression::Stored)
        .with_base_offset(100)
        .write(&entries)
        .expect("write archive");

    assert_eq!(shifted.base_offset(), 100);
    assert_eq!(shifted.records()[0].local_header_offset, 100);
    for (left, right) in plain.records().iter().zip(shifted.records()) {
        assert_eq!(right.local_header_offset, left.local_header_offset + 100);
    }
    assert_eq!(
        shifted.central_directory_offset(),
        plain.central_directory_offset() + 100
    );
    assert_eq!(plain.bytes().len(), shifted.bytes().len());
}

#[rstest]
fn end_record_points_at_the_central_directory(entries: Vec<ManifestEntry>) {
    let written = ArchiveWriter::new(Compression::Deflated)
        .with_base_offset(7)
        .write(&entries)
        .expect("write archive");

    let (count, offset) =
        read_end_of_central_directory(written.bytes()).expect("end record present");
    assert_eq!(usize::from(count), entries.len());
    assert_eq!(u64::from(offset), written.central_directory_offset());

    let relative = usize::try_from(offset - 7).expect("offset fits usize");
    assert_eq!(u32_at(written.bytes(), relative), CENTRAL_HEADER_SIGNATURE);
}

#[rstest]
fn headers_carry_fixed_timestamps_and_unix_host(entries: Vec<ManifestEntry>) {
    let written = ArchiveWriter::new(Compression::Stored)
        .write(&entries)
        .expect("write archive");
    let bytes = written.bytes();

    assert_eq!(u32_at(bytes, 0), LOCAL_HEADER_SIGNATURE);
    assert_eq!(u16_at(bytes, 10), DOS_TIME);
    assert_eq!(u16_at(bytes, 12), 0x0021);

    let central = usize::try_from(written.central_directory_offset()).expect("fits usize");
    assert_eq!(u16_at(bytes, central + 4), VERSION_MADE_BY);
    assert_eq!(u16_at(bytes, central + 4) >> 8, 3);
    assert_eq!(u16_at(bytes, central + 14), 0x0021);
}

#[rstest]
fn crc_covers_the_uncompressed_payload(entries: Vec<ManifestEntry>) {
    let written = ArchiveWriter::new(Compression::Deflated)
        .write(&entries)
        .expect("write archive");

    let record = &written.records()[1];
    assert_eq!(record.method, Compression::Deflated);
    assert_eq!(record.crc32, crc32fast::hash(entries[1].payload()));
    assert_eq!(record.uncompressed_size, entries[1].payload().len() as u64);
}

#[test]
fn non_ascii_names_set_the_utf8_flag() {
    let entries = [
        ManifestEntry::new("plain.py", Vec::new()),
        ManifestEntry::new("caf\u{e9}.py", Vec::new()),
    ];
    let written = ArchiveWriter::new(Compression::Stored)
        .write(&entries)
        .expect("write archive");

    let second = usize::try_from(written.records()[1].local_header_offset).expect("fits usize");
    assert_eq!(u16_at(written.bytes(), 6), 0);
    assert_eq!(u16_at(written.bytes(), second + 6), FLAG_UTF8);
    assert_eq!(read_back(written.bytes())[1].0, "caf\u{e9}.py");
}

#[rstest]
fn output_is_deterministic(entries: Vec<ManifestEntry>) {
    let writer = ArchiveWriter::new(Compression::Deflated).with_base_offset(23);
    let first = writer.write(&entries).expect("write archive");
    let second = writer.write(&entries).expect("write archive");
    assert_eq!(first.bytes(), second.bytes());
}

#[test]
fn empty_input_produces_only_an_end_record() {
    let written = ArchiveWriter::new(Compression::Stored)
        .write(&[])
        .expect("write archive");
    assert_eq!(written.bytes().len(), END_OF_CENTRAL_DIRECTORY_LEN);
    assert_eq!(read_end_of_central_directory(written.bytes()), Some((0, 0)));
}

fn limited(limits: ArchiveLimits) -> ArchiveWriter {
    ArchiveWriter::new(Compression::Stored).with_limits(limits)
}

#[test]
fn oversized_entries_are_fatal() {
    let writer = limited(ArchiveLimits {
        max_field: 16,
        ..ArchiveLimits::default()
    });
    let err = writer
        .write(&[ManifestEntry::new("big.bin", vec![0; 17])])
        .expect_err("entry exceeds limit");

    assert!(matches!(
        err,
        ArchiveError::EntryTooLarge { ref path, size: 17, limit: 16 } if path == "big.bin"
    ));
}

#[test]
fn offsets_past_the_limit_are_fatal() {
    let writer = limited(ArchiveLimits {
        max_field: 100,
        ..ArchiveLimits::default()
    });
    let entries = [
        ManifestEntry::new("a.py", vec![b'a'; 60]),
        ManifestEntry::new("b.py", vec![b'b'; 60]),
    ];
    let err = writer.write(&entries).expect_err("offset exceeds limit");
    assert!(matches!(err, ArchiveError::ArchiveTooLarge { .. }));
}

#[test]
fn prefix_counts_towards_the_offset_limit() {
    let writer = limited(ArchiveLimits {
        max_field: 100,
        ..ArchiveLimits::default()
    })
    .with_base_offset(101);
    let err = writer
        .write(&[ManifestEntry::new("a.py", Vec::new())])
        .expect_err("base offset exceeds limit");
    assert!(matches!(
        err,
        ArchiveError::ArchiveTooLarge {
            field: "local header offset",
            value: 101,
            ..
        }
    ));
}

#[test]
fn too_many_entries_are_fatal() {
    let writer = limited(ArchiveLimits {
        max_entries: 2,
        ..ArchiveLimits::default()
    });
    let entries = [
        ManifestEntry::new("a.py", Vec::new()),
        ManifestEntry::new("b.py", Vec::new()),
        ManifestEntry::new("c.py", Vec::new()),
    ];
    let err = writer.write(&entries).expect_err("count exceeds limit");
    assert!(matches!(
        err,
        ArchiveError::ArchiveTooLarge {
            field: "entry count",
            value: 3,
            limit: 2
        }
    ));
}

#[test]
fn long_names_are_fatal() {
    let writer = limited(ArchiveLimits {
        max_name_len: 8,
        ..ArchiveLimits::default()
    });
    let err = writer
        .write(&[ManifestEntry::new("long_name.py", Vec::new())])
        .expect_err("name exceeds limit");
    assert!(matches!(
        err,
        ArchiveError::PathTooLong {
            length: 12,
            limit: 8,
            ..
        }
    ));
}

#[test]
fn default_limits_stop_short_of_zip64_markers() {
    let limits = ArchiveLimits::default();
    assert_eq!(limits.max_field, u64::from(u32::MAX) - 1);
    assert_eq!(limits.max_entries, u64::from(u16::MAX) - 1);
    assert_eq!(limits.max_name_len, usize::from(u16::MAX));
}
