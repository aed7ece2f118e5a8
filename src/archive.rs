//! Increment archiver
//!
//! Producer side of an increment. Scans every data file, writes the
//! `INCR_MANIFEST` entry describing the result, then one tar entry per new or
//! updated file.
//!
//! Sidecars are only touched once the whole stream has been written: a
//! failed increment leaves them as they were, so the next attempt carries
//! the same changes again.

use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::config::Config;
use crate::error::{IncrError, Result};
use crate::file_info::FileInfo;
use crate::incr::{
    retire_sidecars, DiffScanner, FileChange, FileDiff, IncrementPlan, SidecarUpdate, SidecarWriter,
};
use crate::manifest::{ManifestClassification, TextManifest};
use crate::page::ChecksumVerifier;
use crate::tar::{TarBlockWriter, TarHeader, INCR_MANIFEST};

/// What one increment carried
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncrementSummary {
    pub new_files: Vec<String>,
    pub updated_files: Vec<String>,
    pub unchanged_files: Vec<String>,
    pub deleted_files: Vec<String>,

    /// Files scanned without a sidecar known at start
    pub mid_backup_files: Vec<String>,

    /// Pages carried for updated files
    pub changed_pages: usize,

    /// Data bytes carried, manifest and tar framing excluded
    pub payload_bytes: u64,

    /// Total bytes of tar stream written
    pub archive_bytes: u64,
}

/// Writes increments for a set of data files
pub struct IncrementArchiver<V> {
    config: Config,
    verifier: V,
}

impl<V: ChecksumVerifier> IncrementArchiver<V> {
    pub fn new(config: Config, verifier: V) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, verifier })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Scan `files` and write the increment to `out`
    ///
    /// Files are carried in the order given. Sidecars in the increment
    /// directory that no file claimed are reported as deleted, after all
    /// other files.
    ///
    /// After the terminator blocks are written, the staged sidecar records
    /// are applied and the sidecars of deleted files are removed.
    pub fn write_increment<W: Write>(&self, files: &[FileInfo], out: &mut W) -> Result<IncrementSummary> {
        let scanner = DiffScanner::new(&self.config, &self.verifier);
        let writer = SidecarWriter::new(&self.config, &self.verifier);

        // Pass 1: diff every file
        let mut plan = IncrementPlan::discover(&self.config.incr_dir, self.config.new_file_policy)?;
        let mut diffs = Vec::with_capacity(files.len());
        for file in files {
            let diff = plan.scan_file(&scanner, file)?;
            diffs.push((file, diff));
        }

        let mut summary = IncrementSummary {
            mid_backup_files: plan.mid_backup_files().to_vec(),
            ..Default::default()
        };
        let deleted = plan.finish();

        let manifest = Self::classify(&diffs, &deleted)?;

        // Pass 2: manifest first, then payloads
        let mut tar = TarBlockWriter::new(out);
        let mut updates: Vec<SidecarUpdate> = Vec::new();
        let mtime = now();
        tar.append(INCR_MANIFEST, TextManifest::render(&manifest).as_bytes(), mtime)?;

        for (file, diff) in &diffs {
            let name = file.filename().to_string();
            match diff.change() {
                FileChange::New { size } => {
                    tar.begin_entry(&TarHeader::new(file.filename(), size).with_mtime(mtime))?;
                    let (written, update) = writer.stage_full(file, &mut tar)?;
                    Self::check_size(file, size, written)?;
                    tar.finish_entry()?;
                    updates.push(update);
                    summary.payload_bytes += written;
                    summary.new_files.push(name);
                }
                FileChange::Updated { pages } => {
                    let size = diff.changed_bytes;
                    tar.begin_entry(&TarHeader::new(file.filename(), size).with_mtime(mtime))?;
                    let (written, update) = writer.stage_incremental(file, &pages, &mut tar)?;
                    Self::check_size(file, size, written)?;
                    tar.finish_entry()?;
                    updates.push(update);
                    summary.payload_bytes += written;
                    summary.changed_pages += pages.len();
                    summary.updated_files.push(name);
                }
                FileChange::Unchanged | FileChange::Deleted => summary.unchanged_files.push(name),
            }
        }

        summary.archive_bytes = tar.position();
        tar.finish()?;
        summary.archive_bytes += 2 * crate::tar::BLOCK_SIZE as u64;

        // Commit: the stream is complete, record what it carried
        for update in updates {
            update.apply()?;
        }
        retire_sidecars(&self.config.incr_dir, &deleted)?;
        summary.deleted_files = deleted;

        info!(
            new = summary.new_files.len(),
            updated = summary.updated_files.len(),
            unchanged = summary.unchanged_files.len(),
            deleted = summary.deleted_files.len(),
            pages = summary.changed_pages,
            payload_bytes = summary.payload_bytes,
            "wrote increment"
        );
        Ok(summary)
    }

    /// Manifest for the scanned files; unchanged files are left out
    fn classify(diffs: &[(&FileInfo, FileDiff)], deleted: &[String]) -> Result<ManifestClassification> {
        let mut manifest = ManifestClassification::new();
        manifest.add_option(format!("Producer incrar {}", crate::VERSION));

        for (file, diff) in diffs {
            match diff.change() {
                FileChange::New { .. } => manifest.add_new((*file).clone())?,
                FileChange::Updated { pages } => manifest.add_updated((*file).clone(), pages)?,
                FileChange::Unchanged | FileChange::Deleted => {}
            }
        }
        for name in deleted {
            manifest.add_deleted(name)?;
        }
        Ok(manifest)
    }

    fn check_size(file: &FileInfo, declared: u64, written: u64) -> Result<()> {
        if declared != written {
            return Err(IncrError::serialise(
                file.filename(),
                format!(
                    "file changed between passes: scanned {} bytes, wrote {}",
                    declared, written
                ),
            ));
        }
        Ok(())
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
