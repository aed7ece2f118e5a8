//! Tests for the increment stream decoder
//!
//! These tests verify:
//! - Manifests are classified and keep their processing order
//! - Payloads reach the sink and the stream stays block-aligned
//! - Filler blocks, clean end of input and fatal stream errors

use std::io::{Cursor, Read};

use incrar::decode::{DecodedEntry, DiscardPayload, IncrementDecoder};
use incrar::manifest::TextManifest;
use incrar::tar::{EntryKind, TarBlockReader, TarBlockWriter, TarHeader, BLOCK_SIZE, INCR_MANIFEST};
use incrar::{Config, IncrError, Severity};

// =============================================================================
// Helper Functions
// =============================================================================

fn archive(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut tar = TarBlockWriter::new(Vec::new());
    for (name, payload) in entries {
        tar.append(name, payload, 0).unwrap();
    }
    tar.finish().unwrap()
}

fn decoder() -> IncrementDecoder<TextManifest, DiscardPayload> {
    IncrementDecoder::new(TextManifest::new("/restore"), DiscardPayload)
}

const MANIFEST: &[u8] = b"File A New\nFile B Updated Pages 3 7\nFile C Deleted\n";

// =============================================================================
// Manifest Tests
// =============================================================================

#[test]
fn test_manifest_order_is_preserved() {
    let bytes = archive(&[(INCR_MANIFEST, MANIFEST)]);
    let report = decoder().decode(Cursor::new(bytes)).unwrap();

    let manifest = report.manifest().unwrap();
    assert_eq!(manifest.file_order, vec!["A", "B", "C"]);
    assert!(manifest.new_files.contains_key("A"));
    assert_eq!(manifest.updated_files["B"].1, vec![3, 7]);
    assert!(manifest.deleted_files.contains("C"));
}

#[test]
fn test_manifest_entry_is_reported() {
    let bytes = archive(&[(INCR_MANIFEST, MANIFEST)]);
    let report = decoder().decode(Cursor::new(bytes)).unwrap();

    assert_eq!(
        report.entries,
        vec![DecodedEntry {
            name: INCR_MANIFEST.to_string(),
            size: MANIFEST.len() as u64,
            blocks: 1,
            kind: EntryKind::Manifest,
        }]
    );
    assert_eq!(report.file_entries().count(), 0);
}

#[test]
fn test_incoherent_manifest_is_fatal() {
    let bytes = archive(&[(INCR_MANIFEST, &b"File A New\nFile A New\n"[..])]);
    let err = decoder().decode(Cursor::new(bytes)).unwrap_err();

    assert!(matches!(err, IncrError::Manifest(_)));
    assert!(err.to_string().contains("incoherent manifest"), "{}", err);
    assert_eq!(err.severity(), Severity::Stream);
}

#[test]
fn test_non_utf8_manifest_is_fatal() {
    let bytes = archive(&[(INCR_MANIFEST, &[0xff, 0xfe, 0x00][..])]);
    let err = decoder().decode(Cursor::new(bytes)).unwrap_err();
    assert!(err.to_string().contains("incoherent manifest"), "{}", err);
}

// =============================================================================
// Stream Shape Tests
// =============================================================================

#[test]
fn test_single_zero_block_is_empty_increment() {
    let report = decoder().decode(Cursor::new(vec![0u8; BLOCK_SIZE])).unwrap();
    assert!(report.entries.is_empty());
    assert!(report.manifests.is_empty());
}

#[test]
fn test_missing_terminator_still_ends_cleanly() {
    let mut bytes = archive(&[("t1.data", &[1u8; 10][..])]);
    bytes.truncate(2 * BLOCK_SIZE);

    let report = decoder().decode(Cursor::new(bytes)).unwrap();
    assert_eq!(report.entries.len(), 1);
}

#[test]
fn test_bad_size_stops_at_that_header() {
    let mut bytes = archive(&[(INCR_MANIFEST, MANIFEST), ("t1.data", &[1u8; 10][..])]);
    let second = 2 * BLOCK_SIZE;
    bytes[second + 124..second + 136].copy_from_slice(b"0000000008\0\0");

    let mut reader = TarBlockReader::new(Cursor::new(bytes));
    let err = decoder().decode_blocks(&mut reader).unwrap_err();

    assert!(matches!(err, IncrError::BadSize(_)));
    assert!(err.to_string().contains("bad size"));
    assert_eq!(reader.position(), 3 * BLOCK_SIZE as u64);
}

#[test]
fn test_unterminated_filename_is_fatal() {
    let mut bytes = archive(&[("t1.data", &[1u8; 10][..])]);
    bytes[..100].fill(b'x');

    let err = decoder().decode(Cursor::new(bytes)).unwrap_err();
    assert!(err.to_string().contains("filename is not null terminated"));
}

#[test]
fn test_truncated_block_is_fatal() {
    let mut bytes = archive(&[("t1.data", &[1u8; 10][..])]);
    bytes.truncate(BLOCK_SIZE + 100);

    let err = decoder().decode(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, IncrError::MalformedBlock(_)));
}

#[test]
fn test_manifest_size_beyond_stream_is_fatal() {
    let mut bytes = TarHeader::new(INCR_MANIFEST, 0).to_block().unwrap().to_vec();
    bytes[124..136].copy_from_slice(b"777777777777");

    let err = decoder().decode(Cursor::new(bytes)).unwrap_err();
    assert!(matches!(err, IncrError::MalformedBlock(_)));
    assert_eq!(err.severity(), Severity::Stream);
}

#[test]
fn test_manifest_name_escaping_destination_is_fatal() {
    let bytes = archive(&[(INCR_MANIFEST, &b"File ../etc/passwd New\n"[..])]);
    let err = decoder().decode(Cursor::new(bytes)).unwrap_err();

    assert!(err.to_string().contains("incoherent manifest"), "{}", err);
    assert!(err.to_string().contains("not a plain file name"), "{}", err);
}

#[test]
fn test_header_checksum_follows_config() {
    let mut bytes = archive(&[("t1.data", &[1u8; 10][..])]);
    bytes[400] = b'?';

    assert!(decoder().decode(Cursor::new(bytes.clone())).is_ok());

    let config = Config::builder().verify_header_checksum(true).build();
    let err = decoder().with_config(&config).decode(Cursor::new(bytes)).unwrap_err();
    assert!(err.to_string().contains("header checksum mismatch"));
}

// =============================================================================
// Payload Sink Tests
// =============================================================================

#[test]
fn test_sink_receives_each_payload() {
    let bytes = archive(&[
        (INCR_MANIFEST, MANIFEST),
        ("A", &[0xaau8; 700][..]),
        ("B.data", &[0xbbu8; 20][..]),
    ]);

    let mut seen: Vec<(String, Vec<u8>)> = Vec::new();
    let sink = |header: &TarHeader, payload: &mut dyn Read| -> incrar::Result<()> {
        let mut buf = Vec::new();
        payload.read_to_end(&mut buf)?;
        seen.push((header.name().to_string(), buf));
        Ok(())
    };
    let report = IncrementDecoder::new(TextManifest::new("/restore"), sink)
        .decode(Cursor::new(bytes))
        .unwrap();

    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.entries[1].blocks, 2);
    assert_eq!(report.entries[1].kind, EntryKind::Other);
    assert_eq!(report.entries[2].kind, EntryKind::Data);

    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0], ("A".to_string(), vec![0xaa; 700]));
    assert_eq!(seen[1], ("B.data".to_string(), vec![0xbb; 20]));
}

#[test]
fn test_partially_read_payload_is_skipped() {
    let bytes = archive(&[("a.data", &[1u8; 1500][..]), ("b.data", &[2u8; 4][..])]);

    let mut firsts = Vec::new();
    let sink = |_header: &TarHeader, payload: &mut dyn Read| -> incrar::Result<()> {
        let mut one = [0u8; 1];
        payload.read_exact(&mut one)?;
        firsts.push(one[0]);
        Ok(())
    };
    let report = IncrementDecoder::new(TextManifest::new("/restore"), sink)
        .decode(Cursor::new(bytes))
        .unwrap();

    assert_eq!(report.entries.len(), 2);
    assert_eq!(firsts, vec![1, 2]);
}

#[test]
fn test_sink_error_propagates() {
    let bytes = archive(&[("a.data", &[1u8; 10][..])]);
    let sink = |header: &TarHeader, _payload: &mut dyn Read| -> incrar::Result<()> {
        Err(IncrError::serialise(header.name(), "restore failed"))
    };

    let err = IncrementDecoder::new(TextManifest::new("/restore"), sink)
        .decode(Cursor::new(bytes))
        .unwrap_err();
    assert_eq!(err.severity(), Severity::File);
    assert_eq!(err.to_string(), "a.data: restore failed");
}
