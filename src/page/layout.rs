//! Page field accessors
//!
//! Length-checked views over raw page bytes. Every accessor reads from a
//! fixed offset of a slice that was validated at construction.

use crate::error::{IncrError, Result};

/// Offset of the LSN file number
pub const LSN_FILE_OFFSET: usize = 0;

/// Offset of the LSN byte offset
pub const LSN_OFFSET_OFFSET: usize = 4;

/// Offset of the page's own page number
pub const PGNO_OFFSET: usize = 8;

/// LSN file (4) + LSN offset (4) + page number (4) = 12 bytes
pub const PAGE_HEADER_SIZE: usize = 12;

/// Stored checksum at the end of the page
pub const CHECKSUM_TRAILER_SIZE: usize = 4;

/// Smallest page the layout can describe
pub const MIN_PAGE_SIZE: usize = PAGE_HEADER_SIZE + CHECKSUM_TRAILER_SIZE;

/// Log sequence number: where in the write-ahead log a page was last changed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lsn {
    pub file: u32,
    pub offset: u32,
}

impl Lsn {
    pub fn new(file: u32, offset: u32) -> Self {
        Self { file, offset }
    }

    /// True for pages that were allocated but never logged
    pub fn is_zero(&self) -> bool {
        self.file == 0 && self.offset == 0
    }
}

impl std::fmt::Display for Lsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file, self.offset)
    }
}

// =============================================================================
// Read-only view
// =============================================================================

/// Read-only view over one page
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    bytes: &'a [u8],
}

impl<'a> PageView<'a> {
    /// Wrap `bytes`; rejects slices too short to hold header and trailer
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() < MIN_PAGE_SIZE {
            return Err(IncrError::InvalidPage(format!(
                "page of {} bytes is shorter than the {} byte minimum",
                bytes.len(),
                MIN_PAGE_SIZE
            )));
        }
        Ok(Self { bytes })
    }

    pub fn lsn(&self) -> Lsn {
        Lsn {
            file: read_u32(self.bytes, LSN_FILE_OFFSET),
            offset: read_u32(self.bytes, LSN_OFFSET_OFFSET),
        }
    }

    pub fn pgno(&self) -> u32 {
        read_u32(self.bytes, PGNO_OFFSET)
    }

    /// Checksum kept in the page trailer
    pub fn stored_checksum(&self) -> u32 {
        read_u32(self.bytes, self.bytes.len() - CHECKSUM_TRAILER_SIZE)
    }

    /// Everything the trailer checksum covers
    pub fn checksummed_region(&self) -> &'a [u8] {
        &self.bytes[..self.bytes.len() - CHECKSUM_TRAILER_SIZE]
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// =============================================================================
// Mutable view
// =============================================================================

/// Mutable view over one page, used to stamp header fields
#[derive(Debug)]
pub struct PageMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> PageMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Result<Self> {
        if bytes.len() < MIN_PAGE_SIZE {
            return Err(IncrError::InvalidPage(format!(
                "page of {} bytes is shorter than the {} byte minimum",
                bytes.len(),
                MIN_PAGE_SIZE
            )));
        }
        Ok(Self { bytes })
    }

    pub fn set_lsn(&mut self, lsn: Lsn) {
        write_u32(self.bytes, LSN_FILE_OFFSET, lsn.file);
        write_u32(self.bytes, LSN_OFFSET_OFFSET, lsn.offset);
    }

    pub fn set_pgno(&mut self, pgno: u32) {
        write_u32(self.bytes, PGNO_OFFSET, pgno);
    }

    pub fn set_stored_checksum(&mut self, checksum: u32) {
        let at = self.bytes.len() - CHECKSUM_TRAILER_SIZE;
        write_u32(self.bytes, at, checksum);
    }

    /// Mutable access to the body between header and trailer
    pub fn body_mut(&mut self) -> &mut [u8] {
        let end = self.bytes.len() - CHECKSUM_TRAILER_SIZE;
        &mut self.bytes[PAGE_HEADER_SIZE..end]
    }

    pub fn view(&self) -> PageView<'_> {
        PageView { bytes: self.bytes }
    }
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&bytes[at..at + 4]);
    u32::from_le_bytes(raw)
}

fn write_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
