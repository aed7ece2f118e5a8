//! # incrar
//!
//! Page-granularity incremental backups for page-structured database files:
//! - Per-page (LSN, checksum) records kept in a sidecar next to each file
//! - Diff scanning that finds the pages changed since the last increment
//! - Tar increment streams led by an `INCR_MANIFEST` entry
//! - A consumer-side decoder that classifies new, updated and deleted files
//!
//! ## Architecture Overview
//!
//! ```text
//!        Producer                               Consumer
//! ┌──────────────────────┐              ┌──────────────────────┐
//! │   IncrementArchiver  │              │   IncrementDecoder   │
//! └──────────┬───────────┘              └──────────┬───────────┘
//!            │                                     │
//!     ┌──────┴───────┐                      ┌──────┴───────┐
//!     ▼              ▼                      ▼              ▼
//! ┌────────┐   ┌──────────┐   tar     ┌──────────┐   ┌──────────┐
//! │  incr  │   │   tar    │ ────────▶ │   tar    │   │ manifest │
//! │ (scan, │   │ (writer) │  stream   │ (reader) │   │(classify)│
//! │ write) │   └──────────┘           └──────────┘   └──────────┘
//! └───┬────┘                                             │
//!     ▼                                                  ▼
//! ┌────────┐                                      ┌─────────────┐
//! │  page  │                                      │ PayloadSink │
//! │ (CRC32)│                                      │ (external)  │
//! └────────┘                                      └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod file_info;
pub mod io;

pub mod page;
pub mod incr;
pub mod tar;
pub mod manifest;
pub mod decode;
pub mod archive;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{IncrError, Result, Severity};
pub use config::{Config, NewFilePolicy};
pub use file_info::FileInfo;
pub use archive::{IncrementArchiver, IncrementSummary};
pub use decode::{DecodeReport, DiscardPayload, IncrementDecoder, PayloadSink};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of incrar
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
