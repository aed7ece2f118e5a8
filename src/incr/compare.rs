//! Checksum/LSN comparator

use crate::error::{IncrError, Result};
use crate::page::{ChecksumVerifier, VerifyOptions};

use super::record::{PageRecord, RECORD_SIZE};

/// Decide whether a live page differs from its recorded triple
///
/// The page's LSN and freshly computed checksum are packed in sidecar layout
/// and compared byte for byte with `old_record`. Page contents are never
/// compared directly: any mutation is expected to move the LSN or the
/// checksum. The verifier's validity verdict is ignored here.
pub fn page_changed<V: ChecksumVerifier + ?Sized>(
    page: &[u8],
    old_record: &[u8],
    pagesize: usize,
    verifier: &V,
) -> Result<bool> {
    if old_record.len() != RECORD_SIZE {
        return Err(IncrError::InvalidPage(format!(
            "sidecar record must be {} bytes, got {}",
            RECORD_SIZE,
            old_record.len()
        )));
    }

    let (fresh, _verdict) = PageRecord::capture(page, pagesize, verifier, VerifyOptions::STRICT)?;
    Ok(fresh.to_bytes()[..] != old_record[..])
}
