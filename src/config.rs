//! Configuration for incrar
//!
//! Centralized configuration with sensible defaults. Paths, table filters and
//! mode flags are resolved by the caller; this only carries what the
//! incremental core needs.

use std::path::PathBuf;

use crate::error::{IncrError, Result};

/// Page size used when a `FileInfo` leaves it unset (0)
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Alignment required for direct, unbuffered page I/O
pub const DEFAULT_IO_ALIGNMENT: usize = 512;

/// Main configuration for an incremental backup or restore run
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Producer Configuration
    // -------------------------------------------------------------------------
    /// Directory holding one sidecar per data file
    /// Internal structure:
    ///   {incr_dir}/
    ///     ├── t1.data.incr     (12-byte record per page of t1.data)
    ///     └── t2.index.incr
    pub incr_dir: PathBuf,

    /// Page size applied when a file does not declare one
    pub default_page_size: usize,

    /// Alignment of page buffers (bytes, power of two)
    pub io_alignment: usize,

    /// What to do when a data file has no sidecar known at increment start
    pub new_file_policy: NewFilePolicy,

    /// Open data files with O_DIRECT (Linux only, ignored elsewhere)
    pub direct_io: bool,

    // -------------------------------------------------------------------------
    // Consumer Configuration
    // -------------------------------------------------------------------------
    /// Destination directory that manifest file paths resolve against
    pub data_dest_dir: PathBuf,

    /// Reject tar headers whose checksum field does not match
    pub verify_header_checksum: bool,
}

/// Policy for a data file whose sidecar was not present when the increment
/// started (the file set advanced while the scan was running)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NewFilePolicy {
    /// Log and keep going
    #[default]
    Warn,

    /// Treat as a per-file failure
    Fail,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            incr_dir: PathBuf::from("./incr"),
            default_page_size: DEFAULT_PAGE_SIZE,
            io_alignment: DEFAULT_IO_ALIGNMENT,
            new_file_policy: NewFilePolicy::Warn,
            direct_io: false,
            data_dest_dir: PathBuf::from("."),
            verify_header_checksum: false,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check values that would otherwise surface as confusing I/O failures
    pub fn validate(&self) -> Result<()> {
        if !self.io_alignment.is_power_of_two() {
            return Err(IncrError::Config(format!(
                "io_alignment {} is not a power of two",
                self.io_alignment
            )));
        }
        if self.default_page_size == 0 || self.default_page_size % self.io_alignment != 0 {
            return Err(IncrError::Config(format!(
                "default_page_size {} is not a multiple of io_alignment {}",
                self.default_page_size, self.io_alignment
            )));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the sidecar directory
    pub fn incr_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.incr_dir = path.into();
        self
    }

    /// Set the fallback page size
    pub fn default_page_size(mut self, size: usize) -> Self {
        self.config.default_page_size = size;
        self
    }

    /// Set the page buffer alignment
    pub fn io_alignment(mut self, align: usize) -> Self {
        self.config.io_alignment = align;
        self
    }

    /// Set the mid-backup new file policy
    pub fn new_file_policy(mut self, policy: NewFilePolicy) -> Self {
        self.config.new_file_policy = policy;
        self
    }

    /// Enable or disable O_DIRECT data file reads
    pub fn direct_io(mut self, enabled: bool) -> Self {
        self.config.direct_io = enabled;
        self
    }

    /// Set the restore destination directory
    pub fn data_dest_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dest_dir = path.into();
        self
    }

    /// Enable or disable tar header checksum validation
    pub fn verify_header_checksum(mut self, enabled: bool) -> Self {
        self.config.verify_header_checksum = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
