//! Tar block header
//!
//! Parses and builds the 512-byte POSIX ustar header. Only the name, size,
//! mode and mtime fields carry meaning for increments; everything else is
//! written with fixed defaults and ignored on read.

use crate::error::{IncrError, Result};

/// Size of one tar block
pub const BLOCK_SIZE: usize = 512;

/// Entry name of the manifest that leads every increment
pub const INCR_MANIFEST: &str = "INCR_MANIFEST";

/// Extension marking a page-structured data file
pub const DATA_EXTENSION: &str = "data";

// Field layout (offset, length)
const NAME: (usize, usize) = (0, 100);
const MODE: (usize, usize) = (100, 8);
const UID: (usize, usize) = (108, 8);
const GID: (usize, usize) = (116, 8);
const SIZE: (usize, usize) = (124, 12);
const MTIME: (usize, usize) = (136, 12);
const CHKSUM: (usize, usize) = (148, 8);
const TYPEFLAG: usize = 156;
const MAGIC: (usize, usize) = (257, 6);
const VERSION: (usize, usize) = (263, 2);

const USTAR_MAGIC: &[u8; 6] = b"ustar\0";
const USTAR_VERSION: &[u8; 2] = b"00";
const REGULAR_FILE: u8 = b'0';
const DEFAULT_MODE: u32 = 0o600;

/// Largest size an 11-digit octal field can carry
pub const MAX_ENTRY_SIZE: u64 = 0o77777777777;

/// What an entry carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// The `INCR_MANIFEST` entry
    Manifest,
    /// A page-structured data file (`*.data`)
    Data,
    /// Anything else
    Other,
}

/// A decoded tar header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarHeader {
    name: String,
    size: u64,
    mode: u32,
    mtime: u64,
}

impl TarHeader {
    /// Header for a regular file entry, mode 0600, mtime 0
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            mode: DEFAULT_MODE,
            mtime: 0,
        }
    }

    pub fn with_mtime(mut self, mtime: u64) -> Self {
        self.mtime = mtime;
        self
    }

    pub fn with_mode(mut self, mode: u32) -> Self {
        self.mode = mode;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Payload length in bytes
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn mode(&self) -> u32 {
        self.mode
    }

    pub fn mtime(&self) -> u64 {
        self.mtime
    }

    /// Number of 512-byte blocks the payload occupies
    pub fn blocks(&self) -> u64 {
        blocks_for(self.size)
    }

    /// Zero bytes appended after the payload to reach a block boundary
    pub fn padding(&self) -> u64 {
        self.blocks() * BLOCK_SIZE as u64 - self.size
    }

    pub fn is_manifest(&self) -> bool {
        self.name == INCR_MANIFEST
    }

    /// Classify the entry by name
    ///
    /// The extension is everything after the first `.`, so "t1.data" is a
    /// data file while "t1.data.old" is not.
    pub fn kind(&self) -> EntryKind {
        if self.is_manifest() {
            return EntryKind::Manifest;
        }
        match self.name.split_once('.') {
            Some((_, ext)) if ext == DATA_EXTENSION => EntryKind::Data,
            _ => EntryKind::Other,
        }
    }

    /// Decode a header block
    ///
    /// The last byte of the name field must be NUL; the name runs up to the
    /// first NUL. The size must be octal. The stored header checksum is only
    /// checked when `verify_checksum` is set.
    pub fn parse(block: &[u8; BLOCK_SIZE], verify_checksum: bool) -> Result<Self> {
        let name_field = field(block, NAME);
        if name_field[NAME.1 - 1] != 0 {
            return Err(IncrError::MalformedBlock("filename is not null terminated".into()));
        }
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(NAME.1 - 1);
        let name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|_| IncrError::MalformedBlock("filename is not valid UTF-8".into()))?
            .to_string();

        let size = parse_octal(field(block, SIZE))
            .ok_or_else(|| IncrError::BadSize(display_field(field(block, SIZE))))?;

        if verify_checksum {
            let stored = parse_octal(field(block, CHKSUM)).ok_or_else(|| {
                IncrError::MalformedBlock(format!(
                    "unreadable header checksum {}",
                    display_field(field(block, CHKSUM))
                ))
            })?;
            let computed = header_checksum(block);
            if stored != computed {
                return Err(IncrError::MalformedBlock(format!(
                    "header checksum mismatch for {}: stored {:o}, computed {:o}",
                    name, stored, computed
                )));
            }
        }

        // Mode and mtime are informational; tolerate junk there.
        let mode = parse_octal(field(block, MODE)).unwrap_or(0) as u32;
        let mtime = parse_octal(field(block, MTIME)).unwrap_or(0);

        Ok(Self {
            name,
            size,
            mode,
            mtime,
        })
    }

    /// Encode as a ustar header block
    pub fn to_block(&self) -> Result<[u8; BLOCK_SIZE]> {
        if self.name.is_empty() || self.name.len() >= NAME.1 {
            return Err(IncrError::MalformedBlock(format!(
                "entry name must be 1 to {} bytes: {:?}",
                NAME.1 - 1,
                self.name
            )));
        }
        if self.name.as_bytes().contains(&0) {
            return Err(IncrError::MalformedBlock(format!(
                "entry name contains NUL: {:?}",
                self.name
            )));
        }
        if self.size > MAX_ENTRY_SIZE {
            return Err(IncrError::BadSize(format!(
                "{} exceeds the largest ustar entry",
                self.size
            )));
        }

        let mut block = [0u8; BLOCK_SIZE];
        block[NAME.0..NAME.0 + self.name.len()].copy_from_slice(self.name.as_bytes());
        write_octal(field_mut(&mut block, MODE), self.mode as u64);
        write_octal(field_mut(&mut block, UID), 0);
        write_octal(field_mut(&mut block, GID), 0);
        write_octal(field_mut(&mut block, SIZE), self.size);
        write_octal(field_mut(&mut block, MTIME), self.mtime);
        block[TYPEFLAG] = REGULAR_FILE;
        field_mut(&mut block, MAGIC).copy_from_slice(USTAR_MAGIC);
        field_mut(&mut block, VERSION).copy_from_slice(USTAR_VERSION);

        // Checksum: six octal digits, NUL, space
        let checksum = header_checksum(&block);
        let chksum = field_mut(&mut block, CHKSUM);
        write_octal(&mut chksum[..7], checksum);
        chksum[7] = b' ';

        Ok(block)
    }
}

/// Blocks needed for `size` payload bytes
pub fn blocks_for(size: u64) -> u64 {
    size.div_ceil(BLOCK_SIZE as u64)
}

/// True for the all-zero filler/terminator block
pub fn is_zero_block(block: &[u8]) -> bool {
    block.iter().all(|&b| b == 0)
}

// =============================================================================
// Field Helpers
// =============================================================================

fn field(block: &[u8; BLOCK_SIZE], (offset, len): (usize, usize)) -> &[u8] {
    &block[offset..offset + len]
}

fn field_mut(block: &mut [u8; BLOCK_SIZE], (offset, len): (usize, usize)) -> &mut [u8] {
    &mut block[offset..offset + len]
}

/// Parse an unsigned octal field
///
/// Accepts optional leading spaces, then at least one octal digit, then
/// either the end of the field or a NUL/space terminator followed only by
/// NUL/space padding.
fn parse_octal(field: &[u8]) -> Option<u64> {
    let start = field.iter().position(|&b| b != b' ')?;
    let digits = &field[start..];

    let end = digits
        .iter()
        .position(|b| !(b'0'..=b'7').contains(b))
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if !digits[end..].iter().all(|&b| b == 0 || b == b' ') {
        return None;
    }

    digits[..end].iter().try_fold(0u64, |acc, &b| {
        acc.checked_mul(8)?.checked_add((b - b'0') as u64)
    })
}

/// Zero-padded octal in all but the last byte, NUL terminated
fn write_octal(field: &mut [u8], value: u64) {
    let width = field.len() - 1;
    let text = format!("{:0width$o}", value, width = width);
    field[..width].copy_from_slice(&text.as_bytes()[text.len() - width..]);
    field[width] = 0;
}

/// Unsigned byte sum with the checksum field read as spaces
fn header_checksum(block: &[u8; BLOCK_SIZE]) -> u64 {
    block
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (CHKSUM.0..CHKSUM.0 + CHKSUM.1).contains(&i) {
                b' ' as u64
            } else {
                b as u64
            }
        })
        .sum()
}

fn display_field(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches(|c: char| c == '\0' || c == ' ')
        .escape_debug()
        .to_string()
}
