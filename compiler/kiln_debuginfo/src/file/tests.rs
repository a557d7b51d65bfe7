#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;

use super::*;

fn sections() -> Vec<DebugSection> {
    vec![
        DebugSection::new("kiln_str", vec![1, b'a']),
        DebugSection::new("kiln_line", vec![3, 1, 2, 8]),
    ]
}

#[test]
fn header_is_little_endian_magic_then_version() {
    let bytes = write_debug_file(&[]).unwrap();
    assert_eq!(bytes, vec![0x74, 0x64, 0x62, 0x67, 1, 0, 0, 0]);
}

#[test]
fn records_are_name_length_and_data() {
    let bytes = write_debug_file(&sections()[..1]).unwrap();
    assert_eq!(
        &bytes[8..],
        &[8, b'k', b'i', b'l', b'n', b'_', b's', b't', b'r', 2, 1, b'a']
    );
}

#[test]
fn file_reads_back() {
    let bytes = write_debug_file(&sections()).unwrap();
    assert_eq!(read_debug_file(&bytes), Ok(sections()));
}

#[test]
fn wrong_magic() {
    assert_eq!(
        read_debug_file(&[0, 0, 0, 0, 1, 0, 0, 0]),
        Err(DebugFileError::BadMagic(0))
    );
}

#[test]
fn newer_version() {
    let mut bytes = write_debug_file(&[]).unwrap();
    bytes[4] = 2;
    assert_eq!(
        read_debug_file(&bytes),
        Err(DebugFileError::UnsupportedVersion(2))
    );
}

#[test]
fn truncated_record() {
    let mut bytes = write_debug_file(&sections()).unwrap();
    bytes.pop();
    let record = 8 + 1 + 8 + 1 + 2;
    assert_eq!(
        read_debug_file(&bytes),
        Err(DebugFileError::Truncated {
            offset: record + 1 + 9 + 1,
        })
    );
}

#[test]
fn names_must_be_short_ascii() {
    let long = DebugSection::new("x".repeat(256), vec![]);
    assert!(matches!(
        write_debug_file(&[long]),
        Err(DebugFileError::InvalidName(_))
    ));
    let accented = DebugSection::new("café", vec![]);
    assert!(matches!(
        write_debug_file(&[accented]),
        Err(DebugFileError::InvalidName(_))
    ));
}
