//! Per-file diff results

/// What an increment does to one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    /// No sidecar yet: the whole file is copied
    New { size: u64 },

    /// Only the listed pages are copied, in this order
    Updated { pages: Vec<u32> },

    /// Nothing to transfer
    Unchanged,

    /// Sidecar exists but the data file is gone
    Deleted,
}

/// Result of scanning one data file against its sidecar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// Logical filename
    pub filename: String,

    /// Changed page numbers, as read from each page's own header
    pub pages: Vec<u32>,

    /// Bytes to transfer: whole file when new, one page per changed page otherwise
    pub changed_bytes: u64,

    /// No sidecar existed for this file
    pub is_new: bool,

    /// Live file length observed by the scan
    pub file_size: u64,
}

impl FileDiff {
    /// Diff for a file with no sidecar
    pub fn new_file(filename: impl Into<String>, file_size: u64) -> Self {
        Self {
            filename: filename.into(),
            pages: Vec::new(),
            changed_bytes: file_size,
            is_new: true,
            file_size,
        }
    }

    /// True when the increment has to carry anything for this file
    pub fn has_changes(&self) -> bool {
        self.is_new || !self.pages.is_empty()
    }

    /// Tagged view of this diff
    pub fn change(&self) -> FileChange {
        if self.is_new {
            FileChange::New {
                size: self.file_size,
            }
        } else if self.pages.is_empty() {
            FileChange::Unchanged
        } else {
            FileChange::Updated {
                pages: self.pages.clone(),
            }
        }
    }
}
