//! Page Module
//!
//! Raw data file pages: fixed-offset field access, aligned buffers and the
//! checksum verification capability.
//!
//! ## Responsibilities
//! - Read the LSN and page number a page carries about itself
//! - Own page-sized buffers aligned for direct, unbuffered I/O
//! - Recompute and verify page checksums
//!
//! ## Page Layout
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (12 bytes)                                        │
//! │ ┌───────────────┬─────────────────┬────────────────────┐ │
//! │ │ LSN file (4)  │ LSN offset (4)  │ Page number (4)    │ │
//! │ └───────────────┴─────────────────┴────────────────────┘ │
//! ├──────────────────────────────────────────────────────────┤
//! │ Body (page_size - 16 bytes)                              │
//! ├──────────────────────────────────────────────────────────┤
//! │ Stored checksum (4)                                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian. Only the CRC32 verifier looks at the
//! trailer; other verifiers may keep their checksum elsewhere.

mod buffer;
mod checksum;
mod layout;

pub use buffer::PageBuffer;
pub use checksum::{ChecksumVerdict, ChecksumVerifier, Crc32Verifier, VerifyOptions};
pub use layout::{
    Lsn, PageMut, PageView, CHECKSUM_TRAILER_SIZE, LSN_FILE_OFFSET, LSN_OFFSET_OFFSET,
    MIN_PAGE_SIZE, PAGE_HEADER_SIZE, PGNO_OFFSET,
};
