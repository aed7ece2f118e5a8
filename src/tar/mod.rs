//! Tar Module
//!
//! Block framing for the increment transport.
//!
//! ## Responsibilities
//! - Parse and build 512-byte ustar headers (octal fields, header checksum)
//! - Read entries without ever consuming past their padded end
//! - Write entries whose payload matches the declared size exactly
//!
//! ## Stream Layout
//! ```text
//! ┌──────────────────────────────┐
//! │ Header: INCR_MANIFEST        │
//! ├──────────────────────────────┤
//! │ Manifest text + zero padding │
//! ├──────────────────────────────┤
//! │ Header: t1.data              │
//! ├──────────────────────────────┤
//! │ Pages + zero padding         │
//! ├──────────────────────────────┤
//! │ ...                          │
//! ├──────────────────────────────┤
//! │ Zero block                   │
//! │ Zero block                   │
//! └──────────────────────────────┘
//! ```
//! Zero blocks may also appear between entries; readers skip them and stop
//! only when the transport runs dry.

mod header;
mod reader;
mod writer;

pub use header::{
    blocks_for, is_zero_block, EntryKind, TarHeader, BLOCK_SIZE, DATA_EXTENSION, INCR_MANIFEST,
    MAX_ENTRY_SIZE,
};
pub use reader::{EntryReader, TarBlockReader};
pub use writer::TarBlockWriter;
