//! Sidecar page records
//!
//! Defines the 12-byte (LSN file, LSN offset, checksum) triple.

use bytes::{Buf, BufMut};

use crate::error::{IncrError, Result};
use crate::page::{ChecksumVerdict, ChecksumVerifier, Lsn, PageView, VerifyOptions};

/// Size of one record: LSN file (4) + LSN offset (4) + checksum (4)
pub const RECORD_SIZE: usize = 12;

/// What the sidecar remembers about one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRecord {
    pub lsn: Lsn,
    pub checksum: u32,
}

impl PageRecord {
    pub fn new(lsn: Lsn, checksum: u32) -> Self {
        Self { lsn, checksum }
    }

    /// Byte offset of page `pgno`'s record within its sidecar
    pub fn offset_of(pgno: u32) -> u64 {
        pgno as u64 * RECORD_SIZE as u64
    }

    /// Build the record for a live page, recomputing its checksum
    ///
    /// Returns the verifier's verdict alongside so callers that must reject
    /// corrupt pages can do so without a second pass.
    pub fn capture<V: ChecksumVerifier + ?Sized>(
        page: &[u8],
        pagesize: usize,
        verifier: &V,
        options: VerifyOptions,
    ) -> Result<(Self, ChecksumVerdict)> {
        if page.len() < pagesize {
            return Err(IncrError::InvalidPage(format!(
                "expected a {} byte page, got {} bytes",
                pagesize,
                page.len()
            )));
        }
        let view = PageView::new(&page[..pagesize])?;
        let verdict = verifier.verify(page, pagesize, options)?;
        Ok((Self::new(view.lsn(), verdict.checksum), verdict))
    }

    /// Encode as little-endian bytes
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        let mut cursor = &mut out[..];
        cursor.put_u32_le(self.lsn.file);
        cursor.put_u32_le(self.lsn.offset);
        cursor.put_u32_le(self.checksum);
        out
    }

    /// Decode from exactly `RECORD_SIZE` bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RECORD_SIZE {
            return Err(IncrError::InvalidPage(format!(
                "sidecar record must be {} bytes, got {}",
                RECORD_SIZE,
                bytes.len()
            )));
        }
        let mut cursor = bytes;
        let file = cursor.get_u32_le();
        let offset = cursor.get_u32_le();
        let checksum = cursor.get_u32_le();
        Ok(Self::new(Lsn::new(file, offset), checksum))
    }
}
