//! Incremental Module
//!
//! Producer side of page-granularity incremental backups.
//!
//! ## Responsibilities
//! - Decide which pages of a data file changed since the last increment
//! - Track which sidecars were consumed so deletions can be reported
//! - Stream changed pages to the backup output and refresh their records
//!
//! ## Sidecar Format
//! One `{filename}.incr` per data file, an array of fixed-size records
//! indexed by page number (page `n` lives at byte `12 * n`):
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Record 0                                    │
//! │ ┌──────────────┬────────────────┬─────────┐ │
//! │ │ LSN file (4) │ LSN offset (4) │ CRC (4) │ │
//! │ └──────────────┴────────────────┴─────────┘ │
//! ├─────────────────────────────────────────────┤
//! │ Record 1                                    │
//! │ ...                                         │
//! └─────────────────────────────────────────────┘
//! ```
//! A page is considered unchanged iff its (LSN, checksum) triple matches the
//! recorded one byte for byte.

mod change;
mod compare;
mod plan;
mod record;
mod scan;
mod writer;

pub use change::{FileChange, FileDiff};
pub use compare::page_changed;
pub use plan::{retire_sidecars, IncrementPlan};
pub use record::{PageRecord, RECORD_SIZE};
pub use scan::DiffScanner;
pub use writer::{SidecarUpdate, SidecarWriter};
