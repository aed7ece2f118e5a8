//! Page checksum verification
//!
//! The engine never interprets a checksum itself: it asks a
//! `ChecksumVerifier` to recompute one and say whether the page agrees with
//! it. `Crc32Verifier` covers the trailer-checksum layout described in the
//! module docs.

use crate::error::{IncrError, Result};

use super::layout::{PageMut, PageView, MIN_PAGE_SIZE};

/// Flags passed through to the verifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    /// Page 0 of its file (metadata page)
    pub first_page: bool,

    /// Accept a never-logged page (zero LSN, zero stored checksum)
    pub zero_lsn_ok: bool,
}

impl VerifyOptions {
    /// Plain checksum recomputation, no special cases
    pub const STRICT: VerifyOptions = VerifyOptions {
        first_page: false,
        zero_lsn_ok: false,
    };
}

/// Outcome of recomputing a page checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksumVerdict {
    /// Page content agrees with its checksum
    pub valid: bool,

    /// Freshly computed checksum (meaningful even when `valid` is false)
    pub checksum: u32,
}

/// Recomputes page checksums
pub trait ChecksumVerifier {
    /// Verify the first `pagesize` bytes of `page`
    fn verify(&self, page: &[u8], pagesize: usize, options: VerifyOptions)
        -> Result<ChecksumVerdict>;
}

impl<V: ChecksumVerifier + ?Sized> ChecksumVerifier for &V {
    fn verify(
        &self,
        page: &[u8],
        pagesize: usize,
        options: VerifyOptions,
    ) -> Result<ChecksumVerdict> {
        (**self).verify(page, pagesize, options)
    }
}

/// CRC32 over everything but the 4-byte trailer, stored in the trailer
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc32Verifier;

impl Crc32Verifier {
    pub fn new() -> Self {
        Self
    }

    /// Compute the checksum a page should carry
    pub fn compute(page: &[u8]) -> Result<u32> {
        let view = PageView::new(page)?;
        Ok(crc32fast::hash(view.checksummed_region()))
    }

    /// Stamp the correct checksum into the trailer and return it
    pub fn seal(page: &mut [u8]) -> Result<u32> {
        let checksum = Self::compute(page)?;
        PageMut::new(page)?.set_stored_checksum(checksum);
        Ok(checksum)
    }
}

impl ChecksumVerifier for Crc32Verifier {
    fn verify(
        &self,
        page: &[u8],
        pagesize: usize,
        options: VerifyOptions,
    ) -> Result<ChecksumVerdict> {
        if pagesize < MIN_PAGE_SIZE || page.len() < pagesize {
            return Err(IncrError::InvalidPage(format!(
                "cannot verify {} byte page from a {} byte buffer",
                pagesize,
                page.len()
            )));
        }
        let view = PageView::new(&page[..pagesize])?;
        let checksum = crc32fast::hash(view.checksummed_region());
        let stored = view.stored_checksum();

        // first_page does not change the covered region in this layout.
        let valid = stored == checksum
            || (options.zero_lsn_ok && view.lsn().is_zero() && stored == 0);

        Ok(ChecksumVerdict { valid, checksum })
    }
}
