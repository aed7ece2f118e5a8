//! Incremental diff scanner
//!
//! Walks a data file page by page in lock-step with its sidecar.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{IncrError, Result};
use crate::file_info::FileInfo;
use crate::io::{open_data_file, read_full};
use crate::page::{ChecksumVerifier, PageBuffer, PageView};

use super::change::FileDiff;
use super::compare::page_changed;
use super::record::RECORD_SIZE;

/// Finds the pages of a data file that changed since its sidecar was written
pub struct DiffScanner<V> {
    /// Directory holding `{filename}.incr` sidecars
    incr_dir: PathBuf,
    /// Page size for files that leave it unset
    default_page_size: usize,
    /// Page buffer alignment
    alignment: usize,
    /// Open data files with O_DIRECT
    direct_io: bool,
    verifier: V,
}

impl<V: ChecksumVerifier> DiffScanner<V> {
    /// Create a scanner from the run configuration
    pub fn new(config: &Config, verifier: V) -> Self {
        Self {
            incr_dir: config.incr_dir.clone(),
            default_page_size: config.default_page_size,
            alignment: config.io_alignment,
            direct_io: config.direct_io,
            verifier,
        }
    }

    /// Sidecar directory this scanner reads from
    pub fn incr_dir(&self) -> &Path {
        &self.incr_dir
    }

    /// Scan one data file
    ///
    /// - No sidecar: the file is new and all of it must be copied
    /// - Otherwise: every full page is compared with its record; a trailing
    ///   partial page is left alone
    /// - Pages past the end of the sidecar have no record and count as changed
    pub fn scan(&self, file: &FileInfo) -> Result<FileDiff> {
        let filename = file.filename();
        let sidecar_path = file.sidecar_path(&self.incr_dir);

        let mut data = open_data_file(file.filepath(), self.direct_io).map_err(|e| {
            IncrError::serialise(filename, format!("cannot open file: {}", e))
        })?;
        let file_size = data
            .metadata()
            .map_err(|e| IncrError::serialise(filename, format!("cannot stat file: {}", e)))?
            .len();

        let sidecar = match File::open(&sidecar_path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(file = filename, size = file_size, "New File");
                return Ok(FileDiff::new_file(filename, file_size));
            }
            Err(e) => {
                return Err(IncrError::serialise(
                    filename,
                    format!("cannot open incr file {}: {}", sidecar_path.display(), e),
                ))
            }
        };
        let mut sidecar = BufReader::new(sidecar);

        let pagesize = file.page_size_or(self.default_page_size);
        let mut page = PageBuffer::new(pagesize, self.alignment)?;
        let mut record = [0u8; RECORD_SIZE];
        let mut sidecar_exhausted = false;

        let mut pages = Vec::new();
        let mut changed_bytes = 0u64;
        let mut bytes_left = file_size;

        while bytes_left >= pagesize as u64 {
            let read_error = |bytes_left: u64| {
                IncrError::serialise(filename, format!("read error after {} bytes", bytes_left))
            };

            let got = read_full(&mut data, page.as_mut_slice()).map_err(|_| read_error(bytes_left))?;
            if got != pagesize {
                return Err(read_error(bytes_left));
            }

            let changed = if sidecar_exhausted {
                true
            } else {
                let got = read_full(&mut sidecar, &mut record).map_err(|_| read_error(bytes_left))?;
                match got {
                    RECORD_SIZE => page_changed(page.as_slice(), &record, pagesize, &self.verifier)?,
                    0 => {
                        debug!(
                            file = filename,
                            bytes_left, "sidecar ends before data file, remaining pages are new"
                        );
                        sidecar_exhausted = true;
                        true
                    }
                    _ => return Err(read_error(bytes_left)),
                }
            };

            if changed {
                pages.push(PageView::new(page.as_slice())?.pgno());
                changed_bytes += pagesize as u64;
            }

            bytes_left -= pagesize as u64;
        }

        debug!(
            file = filename,
            file_size,
            changed_pages = pages.len(),
            changed_bytes,
            "scanned data file"
        );

        Ok(FileDiff {
            filename: filename.to_string(),
            pages,
            changed_bytes,
            is_new: false,
            file_size,
        })
    }
}
