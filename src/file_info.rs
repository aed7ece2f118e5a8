//! Data file identity
//!
//! A `FileInfo` names one database data file: the logical name used inside
//! the archive, where it lives on disk, and its page size.

use std::path::{Path, PathBuf};

use crate::config::DEFAULT_PAGE_SIZE;

/// Extension appended to a data file's name to form its sidecar name
pub const SIDECAR_EXTENSION: &str = "incr";

/// One database data file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    filename: String,
    filepath: PathBuf,
    /// 0 means unset
    pagesize: usize,
}

impl FileInfo {
    pub fn new(filename: impl Into<String>, filepath: impl Into<PathBuf>, pagesize: usize) -> Self {
        Self {
            filename: filename.into(),
            filepath: filepath.into(),
            pagesize,
        }
    }

    /// Logical name used in the archive and for the sidecar
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Location of the live data file
    pub fn filepath(&self) -> &Path {
        &self.filepath
    }

    /// Declared page size (0 when unset)
    pub fn pagesize(&self) -> usize {
        self.pagesize
    }

    /// Page size to use for I/O
    pub fn effective_page_size(&self) -> usize {
        self.page_size_or(DEFAULT_PAGE_SIZE)
    }

    /// Declared page size, or `default` when unset
    pub fn page_size_or(&self, default: usize) -> usize {
        if self.pagesize == 0 {
            default
        } else {
            self.pagesize
        }
    }

    /// `{filename}.incr`
    pub fn sidecar_name(&self) -> String {
        sidecar_name(&self.filename)
    }

    /// `{incr_dir}/{filename}.incr`
    pub fn sidecar_path(&self, incr_dir: &Path) -> PathBuf {
        incr_dir.join(self.sidecar_name())
    }
}

/// `{filename}.incr`
pub fn sidecar_name(filename: &str) -> String {
    format!("{}.{}", filename, SIDECAR_EXTENSION)
}

/// Strip the sidecar extension: "t1.data.incr" → Some("t1.data")
pub fn data_name_of_sidecar(sidecar: &str) -> Option<&str> {
    sidecar
        .strip_suffix(SIDECAR_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .filter(|s| !s.is_empty())
}
