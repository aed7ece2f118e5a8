//! Increment plan
//!
//! Remembers which sidecars existed when the increment started. Each scanned
//! file claims its sidecar; whatever is left unclaimed at the end belongs to
//! a data file that no longer exists.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::NewFilePolicy;
use crate::error::{IncrError, Result};
use crate::file_info::{data_name_of_sidecar, sidecar_name, FileInfo};
use crate::page::ChecksumVerifier;

use super::change::FileDiff;
use super::scan::DiffScanner;

/// Sidecar bookkeeping for one scan pass
#[derive(Debug, Clone)]
pub struct IncrementPlan {
    incr_dir: PathBuf,
    /// Sidecar names (`{filename}.incr`) not yet claimed by a scan
    remaining: BTreeSet<String>,
    policy: NewFilePolicy,
    /// Files that showed up without a sidecar known at start
    mid_backup: Vec<String>,
}

impl IncrementPlan {
    /// List the sidecars currently in `incr_dir`
    ///
    /// A missing directory means no increment was taken yet: every file will
    /// scan as new.
    pub fn discover(incr_dir: &Path, policy: NewFilePolicy) -> Result<Self> {
        let mut known = BTreeSet::new();

        if incr_dir.is_dir() {
            for entry in fs::read_dir(incr_dir)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if is_incr_file(&name) {
                    known.insert(name);
                }
            }
        } else {
            debug!(incr_dir = %incr_dir.display(), "no incr directory, starting from scratch");
        }

        debug!(incr_dir = %incr_dir.display(), sidecars = known.len(), "discovered sidecars");
        Ok(Self::from_known(incr_dir, known, policy))
    }

    /// Build a plan from an already known set of sidecar names
    pub fn from_known<I, S>(incr_dir: &Path, known: I, policy: NewFilePolicy) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            incr_dir: incr_dir.to_path_buf(),
            remaining: known.into_iter().map(Into::into).collect(),
            policy,
            mid_backup: Vec::new(),
        }
    }

    pub fn incr_dir(&self) -> &Path {
        &self.incr_dir
    }

    /// Claim `file`'s sidecar; returns false when it was not known at start
    pub fn claim(&mut self, file: &FileInfo) -> Result<bool> {
        let sidecar = file.sidecar_name();
        if self.remaining.remove(&sidecar) {
            return Ok(true);
        }

        match self.policy {
            NewFilePolicy::Warn => {
                warn!(file = file.filename(), "new incr file found mid backup");
                self.mid_backup.push(file.filename().to_string());
                Ok(false)
            }
            NewFilePolicy::Fail => Err(IncrError::serialise(
                file.filename(),
                "new incr file found mid backup",
            )),
        }
    }

    /// Claim the file's sidecar, then scan it
    pub fn scan_file<V: ChecksumVerifier>(
        &mut self,
        scanner: &DiffScanner<V>,
        file: &FileInfo,
    ) -> Result<FileDiff> {
        self.claim(file)?;
        scanner.scan(file)
    }

    /// Sidecar names nobody has claimed so far
    pub fn remaining(&self) -> impl Iterator<Item = &str> {
        self.remaining.iter().map(String::as_str)
    }

    /// Files that were scanned without a sidecar known at start
    pub fn mid_backup_files(&self) -> &[String] {
        &self.mid_backup
    }

    /// End the pass: data filenames whose sidecar was never claimed, sorted
    pub fn finish(self) -> Vec<String> {
        self.remaining
            .iter()
            .filter_map(|name| data_name_of_sidecar(name))
            .map(str::to_string)
            .collect()
    }
}

/// Remove the sidecars of files an increment reported deleted
///
/// Run once that increment is complete. Afterwards the files are no longer
/// reported deleted, and a recreated file scans as new. Sidecars that are
/// already gone are skipped.
pub fn retire_sidecars(incr_dir: &Path, filenames: &[String]) -> Result<()> {
    for filename in filenames {
        let path = incr_dir.join(sidecar_name(filename));
        match fs::remove_file(&path) {
            Ok(()) => debug!(file = filename.as_str(), "retired incr file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(IncrError::serialise(
                    filename.as_str(),
                    format!("cannot remove incr file {}: {}", path.display(), e),
                ))
            }
        }
    }
    Ok(())
}

/// "t1.data.incr" → true, "t1.data" / ".incr" → false
fn is_incr_file(name: &str) -> bool {
    data_name_of_sidecar(name).is_some()
}
