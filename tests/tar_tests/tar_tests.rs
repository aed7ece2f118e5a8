//! Tests for tar block framing
//!
//! These tests verify:
//! - Header build and parse, including the header checksum
//! - Rejection of unterminated names and non-octal sizes
//! - Zero-block filler, clean end of stream and truncated blocks
//! - Payload bounding, padding and the writer's size check

use std::io::{Cursor, Read, Write};

use incrar::tar::{
    blocks_for, EntryKind, TarBlockReader, TarBlockWriter, TarHeader, BLOCK_SIZE, INCR_MANIFEST,
};
use incrar::IncrError;

// =============================================================================
// Helper Functions
// =============================================================================

fn header_block(name: &str, size: u64) -> [u8; BLOCK_SIZE] {
    TarHeader::new(name, size).to_block().unwrap()
}

fn stream(parts: &[&[u8]]) -> Cursor<Vec<u8>> {
    Cursor::new(parts.concat())
}

fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar = TarBlockWriter::new(Vec::new());
    for (name, payload) in entries {
        tar.append(name, payload, 0).unwrap();
    }
    tar.finish().unwrap()
}

// =============================================================================
// Header Tests
// =============================================================================

#[test]
fn test_header_round_trip() {
    let block = TarHeader::new("t1.data", 12345).with_mtime(1_700_000_000).to_block().unwrap();
    let header = TarHeader::parse(&block, true).unwrap();

    assert_eq!(header.name(), "t1.data");
    assert_eq!(header.size(), 12345);
    assert_eq!(header.mtime(), 1_700_000_000);
    assert_eq!(header.blocks(), 25);
    assert_eq!(header.kind(), EntryKind::Data);
    assert_eq!(&block[257..263], b"ustar\0");
    assert_eq!(&block[124..136], b"00000030071\0");
}

#[test]
fn test_manifest_header_is_recognised() {
    let header = TarHeader::parse(&header_block(INCR_MANIFEST, 10), false).unwrap();
    assert!(header.is_manifest());
    assert_eq!(header.kind(), EntryKind::Manifest);
}

#[test]
fn test_unterminated_name_is_rejected() {
    let mut block = header_block("x", 0);
    block[..100].fill(b'a');

    let err = TarHeader::parse(&block, false).unwrap_err();
    assert!(matches!(err, IncrError::MalformedBlock(_)));
    assert!(err.to_string().contains("filename is not null terminated"));
}

#[test]
fn test_name_field_must_end_in_nul() {
    let mut block = header_block("x", 0);
    block[99] = b'z';

    let err = TarHeader::parse(&block, false).unwrap_err();
    assert!(err.to_string().contains("filename is not null terminated"));
}

#[test]
fn test_name_stops_at_first_nul() {
    let mut block = header_block("t1.data", 0);
    block[20] = b'q';
    assert_eq!(TarHeader::parse(&block, false).unwrap().name(), "t1.data");
}

#[test]
fn test_non_octal_size_is_bad_size() {
    let mut block = header_block("t1.data", 0);
    block[124..136].copy_from_slice(b"0000000009x\0");

    let err = TarHeader::parse(&block, false).unwrap_err();
    assert!(matches!(err, IncrError::BadSize(_)));
    assert!(err.to_string().contains("bad size"));
}

#[test]
fn test_size_with_leading_spaces_parses() {
    let mut block = header_block("t1.data", 0);
    block[124..136].copy_from_slice(b"     1000 \0\0");
    assert_eq!(TarHeader::parse(&block, false).unwrap().size(), 0o1000);
}

#[test]
fn test_header_checksum_checked_only_on_request() {
    let mut block = header_block("t1.data", 512);
    block[300] = b'!';

    assert!(TarHeader::parse(&block, false).is_ok());
    let err = TarHeader::parse(&block, true).unwrap_err();
    assert!(err.to_string().contains("header checksum mismatch"));
}

#[test]
fn test_overlong_name_cannot_be_written() {
    let name = "n".repeat(100);
    assert!(TarHeader::new(name, 0).to_block().is_err());
}

#[test]
fn test_blocks_for() {
    assert_eq!(blocks_for(0), 0);
    assert_eq!(blocks_for(1), 1);
    assert_eq!(blocks_for(512), 1);
    assert_eq!(blocks_for(513), 2);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_zero_block_then_eof_ends_stream() {
    let zero = [0u8; BLOCK_SIZE];
    let mut reader = TarBlockReader::new(stream(&[&zero[..]]));

    assert!(reader.next_header(false).unwrap().is_none());
    assert_eq!(reader.position(), BLOCK_SIZE as u64);
}

#[test]
fn test_empty_stream_ends_cleanly() {
    let mut reader = TarBlockReader::new(stream(&[]));
    assert!(reader.next_header(false).unwrap().is_none());
}

#[test]
fn test_zero_blocks_between_entries_are_skipped() {
    let zero = [0u8; BLOCK_SIZE];
    let header = header_block("a.data", 0);
    let mut reader = TarBlockReader::new(stream(&[&zero[..], &zero[..], &header[..], &zero[..]]));

    let found = reader.next_header(false).unwrap().unwrap();
    assert_eq!(found.name(), "a.data");
    assert_eq!(reader.position(), 3 * BLOCK_SIZE as u64);
    assert!(reader.next_header(false).unwrap().is_none());
}

#[test]
fn test_partial_block_is_fatal() {
    let header = header_block("a.data", 0);
    let mut reader = TarBlockReader::new(stream(&[&header[..200]]));

    let err = reader.next_header(false).unwrap_err();
    assert!(matches!(err, IncrError::MalformedBlock(_)));
}

#[test]
fn test_bad_header_is_last_block_consumed() {
    let mut bad = header_block("t1.data", 0);
    bad[124..136].copy_from_slice(b"zzzzzzzzzzz\0");
    let next = header_block("t2.data", 0);
    let mut reader = TarBlockReader::new(stream(&[&bad[..], &next[..]]));

    assert!(reader.next_header(false).is_err());
    assert_eq!(reader.position(), BLOCK_SIZE as u64);
}

#[test]
fn test_entry_reader_is_bounded_and_finish_skips_padding() {
    let bytes = archive(&[("a.data", &b"hello world"[..]), ("b.data", &b"second"[..])]);
    let mut reader = TarBlockReader::new(Cursor::new(bytes));

    let first = reader.next_header(false).unwrap().unwrap();
    let mut entry = reader.entry(&first);
    let mut head = [0u8; 5];
    entry.read_exact(&mut head).unwrap();
    assert_eq!(&head, b"hello");
    assert_eq!(entry.remaining(), 6);
    assert_eq!(entry.finish().unwrap(), 6);
    assert_eq!(reader.position(), 2 * BLOCK_SIZE as u64);

    let second = reader.next_header(false).unwrap().unwrap();
    assert_eq!(second.name(), "b.data");
    let mut rest = Vec::new();
    reader.entry(&second).read_to_end(&mut rest).unwrap();
    assert_eq!(rest, b"second");
}

#[test]
fn test_read_payload() {
    let bytes = archive(&[(INCR_MANIFEST, &b"File a New\n"[..])]);
    let mut reader = TarBlockReader::new(Cursor::new(bytes));

    let header = reader.next_header(false).unwrap().unwrap();
    assert_eq!(reader.read_payload(&header).unwrap(), b"File a New\n");
    assert_eq!(reader.position(), 2 * BLOCK_SIZE as u64);
    assert!(reader.next_header(false).unwrap().is_none());
}

#[test]
fn test_truncated_payload_is_fatal() {
    let header = header_block("a.data", 1000);
    let mut reader = TarBlockReader::new(stream(&[&header[..], &[1u8; 600][..]]));

    let found = reader.next_header(false).unwrap().unwrap();
    assert!(reader.read_payload(&found).is_err());
}

#[test]
fn test_oversized_declared_payload_fails_without_allocating() {
    let mut header = header_block(INCR_MANIFEST, 0);
    header[124..136].copy_from_slice(b"777777777777");
    let mut reader = TarBlockReader::new(stream(&[&header[..], &b"File a New\n"[..]]));

    let found = reader.next_header(false).unwrap().unwrap();
    assert_eq!(found.size(), 0o777777777777);

    let err = reader.read_payload(&found).unwrap_err();
    assert!(matches!(err, IncrError::MalformedBlock(_)));
    assert!(err.to_string().contains("stream ended after 11 of"), "{}", err);
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_writer_pads_and_terminates() {
    let bytes = archive(&[("a.data", &[7u8; 600][..])]);

    // header + two payload blocks + two terminator blocks
    assert_eq!(bytes.len(), 5 * BLOCK_SIZE);
    assert!(bytes[BLOCK_SIZE + 600..].iter().all(|&b| b == 0));
    assert!(bytes[BLOCK_SIZE..BLOCK_SIZE + 600].iter().all(|&b| b == 7));
}

#[test]
fn test_writer_rejects_short_payload() {
    let mut tar = TarBlockWriter::new(Vec::new());
    tar.begin_entry(&TarHeader::new("a.data", 100)).unwrap();
    tar.write_all(&[1u8; 40]).unwrap();

    let err = tar.finish_entry().unwrap_err();
    assert!(matches!(err, IncrError::Serialise { .. }));
}

#[test]
fn test_writer_rejects_overflowing_payload() {
    let mut tar = TarBlockWriter::new(Vec::new());
    tar.begin_entry(&TarHeader::new("a.data", 10)).unwrap();
    assert!(tar.write_all(&[1u8; 11]).is_err());
}

#[test]
fn test_writer_requires_closed_entry() {
    let mut tar = TarBlockWriter::new(Vec::new());
    tar.begin_entry(&TarHeader::new("a.data", 1)).unwrap();

    assert!(tar.begin_entry(&TarHeader::new("b.data", 1)).is_err());
    assert!(tar.finish().is_err());
}

#[test]
fn test_writer_position_tracks_blocks() {
    let mut tar = TarBlockWriter::new(Vec::new());
    tar.append("a.data", &[0u8; 1], 0).unwrap();
    assert_eq!(tar.position(), 2 * BLOCK_SIZE as u64);
    tar.append("b.data", &[], 0).unwrap();
    assert_eq!(tar.position(), 3 * BLOCK_SIZE as u64);
}
