//! Manifest Module
//!
//! The `INCR_MANIFEST` entry tells a restore which files an increment
//! touches and in what order they must be processed.
//!
//! ## Responsibilities
//! - Classify every file as new, updated (with its page list) or deleted
//! - Preserve the processing order the producer chose
//! - Render a classification back to text on the producing side

mod text;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::{IncrError, Result};
use crate::file_info::FileInfo;

pub use text::TextManifest;

/// Turns manifest text into a classification
pub trait ManifestClassifier {
    fn classify(&self, text: &str) -> Result<ManifestClassification>;
}

impl<C: ManifestClassifier + ?Sized> ManifestClassifier for &C {
    fn classify(&self, text: &str) -> Result<ManifestClassification> {
        (**self).classify(text)
    }
}

/// One file of a classification, borrowed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestEntry<'a> {
    New(&'a FileInfo),
    Updated(&'a FileInfo, &'a [u32]),
    Deleted(&'a str),
}

impl ManifestEntry<'_> {
    pub fn filename(&self) -> &str {
        match self {
            ManifestEntry::New(info) | ManifestEntry::Updated(info, _) => info.filename(),
            ManifestEntry::Deleted(name) => *name,
        }
    }
}

/// What one increment does, file by file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestClassification {
    pub new_files: BTreeMap<String, FileInfo>,

    /// Filename → (file, pages in transfer order)
    pub updated_files: BTreeMap<String, (FileInfo, Vec<u32>)>,

    pub deleted_files: BTreeSet<String>,

    /// Every filename above, exactly once, in processing order
    pub file_order: Vec<String>,

    /// Free-form producer options
    pub options: Vec<String>,
}

impl ManifestClassification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files mentioned
    pub fn len(&self) -> usize {
        self.file_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.file_order.is_empty()
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.new_files.contains_key(filename)
            || self.updated_files.contains_key(filename)
            || self.deleted_files.contains(filename)
    }

    pub fn add_new(&mut self, file: FileInfo) -> Result<()> {
        let name = self.claim(file.filename())?;
        self.new_files.insert(name, file);
        Ok(())
    }

    /// Record an updated file; at least one page is required
    pub fn add_updated(&mut self, file: FileInfo, pages: Vec<u32>) -> Result<()> {
        if pages.is_empty() {
            return Err(IncrError::Manifest(format!(
                "updated file {} lists no pages",
                file.filename()
            )));
        }
        let name = self.claim(file.filename())?;
        self.updated_files.insert(name, (file, pages));
        Ok(())
    }

    pub fn add_deleted(&mut self, filename: &str) -> Result<()> {
        let name = self.claim(filename)?;
        self.deleted_files.insert(name);
        Ok(())
    }

    pub fn add_option(&mut self, option: impl Into<String>) {
        self.options.push(option.into());
    }

    /// Files in processing order
    pub fn entries(&self) -> impl Iterator<Item = ManifestEntry<'_>> {
        self.file_order.iter().filter_map(move |name| {
            if let Some(info) = self.new_files.get(name) {
                Some(ManifestEntry::New(info))
            } else if let Some((info, pages)) = self.updated_files.get(name) {
                Some(ManifestEntry::Updated(info, pages.as_slice()))
            } else {
                self.deleted_files
                    .get(name)
                    .map(|name| ManifestEntry::Deleted(name.as_str()))
            }
        })
    }

    /// Append `filename` to the processing order unless it is already there
    fn claim(&mut self, filename: &str) -> Result<String> {
        check_filename(filename)?;
        if self.contains(filename) {
            return Err(IncrError::Manifest(format!(
                "file {} listed more than once",
                filename
            )));
        }
        self.file_order.push(filename.to_string());
        Ok(filename.to_string())
    }
}

/// Reject names that are not a single plain path component
///
/// Restored files are placed at `{data_dest_dir}/{name}`, so a name must not
/// be able to leave that directory. Whitespace would also split the name
/// when the manifest is rendered and read back.
fn check_filename(filename: &str) -> Result<()> {
    if filename.is_empty() {
        return Err(IncrError::Manifest("empty file name".into()));
    }
    if filename == "." || filename == ".." || filename.contains(|c: char| c == '/' || c == '\\') {
        return Err(IncrError::Manifest(format!(
            "file name {:?} is not a plain file name",
            filename
        )));
    }
    if filename.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(IncrError::Manifest(format!(
            "file name {:?} contains whitespace or control characters",
            filename
        )));
    }
    Ok(())
}
