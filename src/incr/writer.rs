//! Incremental sidecar writer
//!
//! Transfers pages to the backup output and produces the sidecar records that
//! describe them. Records are staged as a [`SidecarUpdate`] and only reach
//! the sidecar when the update is applied, so a caller can hold them back
//! until the whole increment has been written.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::{IncrError, Result};
use crate::file_info::FileInfo;
use crate::io::{open_data_file, read_full, write_full};
use crate::page::{ChecksumVerifier, PageBuffer, VerifyOptions};

use super::record::PageRecord;

/// Streams pages of a data file and keeps its sidecar in step
pub struct SidecarWriter<V> {
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

/// Records waiting to be written to one sidecar
#[derive(Debug)]
enum StagedRecords {
    /// Overwrite single records of an existing sidecar
    Patch { records: Vec<(u32, PageRecord)> },
    /// Create or truncate the sidecar and write one record per page
    Replace { records: Vec<PageRecord> },
}

/// Sidecar changes for one transferred file
#[derive(Debug)]
pub struct SidecarUpdate {
    filename: String,
    path: PathBuf,
    staged: StagedRecords,
}

impl SidecarUpdate {
    /// Logical name of the data file
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Sidecar this update writes to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records carried
    pub fn len(&self) -> usize {
        match &self.staged {
            StagedRecords::Patch { records } => records.len(),
            StagedRecords::Replace { records } => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the staged records and sync the sidecar
    ///
    /// A patch overwrites each record in place at `12 * pgno`; the sidecar
    /// is never rewritten as a whole. A replacement creates the sidecar
    /// directory if needed and truncates whatever was there.
    pub fn apply(self) -> Result<()> {
        let filename = self.filename;
        let update_error =
            |e: std::io::Error| IncrError::serialise(&filename, format!("cannot update incr file: {}", e));

        match self.staged {
            StagedRecords::Patch { records } => {
                let mut sidecar = open_existing(&filename, &self.path)?;
                for (pgno, record) in &records {
                    sidecar
                        .seek(SeekFrom::Start(PageRecord::offset_of(*pgno)))
                        .map_err(update_error)?;
                    sidecar.write_all(&record.to_bytes()).map_err(update_error)?;
                }
                sidecar.sync_all().map_err(update_error)?;
                debug!(file = filename.as_str(), records = records.len(), "patched incr file");
            }
            StagedRecords::Replace { records } => {
                if let Some(dir) = self.path.parent() {
                    fs::create_dir_all(dir)?;
                }
                let sidecar = OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(&self.path)
                    .map_err(|e| {
                        IncrError::serialise(
                            &filename,
                            format!("cannot create incr file {}: {}", self.path.display(), e),
                        )
                    })?;
                let mut sidecar = BufWriter::new(sidecar);
                for record in &records {
                    sidecar.write_all(&record.to_bytes()).map_err(update_error)?;
                }
                let sidecar = sidecar
                    .into_inner()
                    .map_err(|e| update_error(e.into_error()))?;
                sidecar.sync_all().map_err(update_error)?;
                debug!(file = filename.as_str(), records = records.len(), "created incr file");
            }
        }
        Ok(())
    }
}

/// Running byte counts for one file transfer
#[derive(Debug, Default)]
struct Transfer {
    read: u64,
    written: u64,
}

impl Transfer {
    /// Account for one chunk; read and written totals must never drift apart
    fn add(&mut self, filename: &str, read: usize, written: usize) -> Result<()> {
        self.read += read as u64;
        self.written += written as u64;
        if self.written != self.read {
            return Err(IncrError::serialise(
                filename,
                format!(
                    "different amounts written and read. wrote {} bytes and read {} bytes",
                    self.written, self.read
                ),
            ));
        }
        Ok(())
    }
}

impl<V: ChecksumVerifier> SidecarWriter<V> {
    /// Create a writer from the run configuration
    pub fn new(config: &Config, verifier: V) -> Self {
        Self {
            incr_dir: config.incr_dir.clone(),
            default_page_size: config.default_page_size,
            alignment: config.io_alignment,
            direct_io: config.direct_io,
            verifier,
        }
    }

    /// Sidecar directory this writer updates
    pub fn incr_dir(&self) -> &Path {
        &self.incr_dir
    }

    /// Transfer the listed pages of `file` to `out` and update their records
    ///
    /// Same as [`stage_incremental`](Self::stage_incremental) followed by
    /// [`SidecarUpdate::apply`]. Returns the number of bytes transferred.
    pub fn write_incremental<W: Write + ?Sized>(
        &self,
        file: &FileInfo,
        pages: &[u32],
        out: &mut W,
    ) -> Result<u64> {
        let (bytes, update) = self.stage_incremental(file, pages, out)?;
        update.apply()?;
        Ok(bytes)
    }

    /// Transfer the listed pages of `file` to `out`, staging their records
    ///
    /// Pages are processed in the given order. Each page is re-read and must
    /// pass checksum verification on its own (the file may have moved on since
    /// the scan). The sidecar must already exist; it stays untouched until the
    /// returned update is applied.
    pub fn stage_incremental<W: Write + ?Sized>(
        &self,
        file: &FileInfo,
        pages: &[u32],
        out: &mut W,
    ) -> Result<(u64, SidecarUpdate)> {
        let filename = file.filename();
        let pagesize = file.page_size_or(self.default_page_size);

        let mut data = self.open_live(file)?;

        // Fail before any page is emitted when there is nothing to patch
        let sidecar_path = file.sidecar_path(&self.incr_dir);
        open_existing(filename, &sidecar_path)?;

        let mut page = PageBuffer::new(pagesize, self.alignment)?;
        let mut transfer = Transfer::default();
        let mut records = Vec::with_capacity(pages.len());

        for &pgno in pages {
            data.seek(SeekFrom::Start(pagesize as u64 * pgno as u64))
                .map_err(|e| {
                    IncrError::serialise(filename, format!("cannot seek to page {}: {}", pgno, e))
                })?;
            let got = read_full(&mut data, page.as_mut_slice()).map_err(|e| {
                IncrError::serialise(filename, format!("read error on page {}: {}", pgno, e))
            })?;
            if got < pagesize {
                return Err(IncrError::serialise(
                    filename,
                    format!("read error on page {}: got {} of {} bytes", pgno, got, pagesize),
                ));
            }

            let (record, verdict) = PageRecord::capture(
                page.as_slice(),
                pagesize,
                &self.verifier,
                VerifyOptions::STRICT,
            )?;
            if !verdict.valid {
                return Err(IncrError::serialise(
                    filename,
                    format!("page {} failed checksum verification", pgno),
                ));
            }
            records.push((pgno, record));

            let written = Self::emit(filename, out, page.as_slice())?;
            transfer.add(filename, got, written)?;
        }

        debug!(
            file = filename,
            pages = pages.len(),
            bytes = transfer.read,
            "wrote incremental pages"
        );
        let update = SidecarUpdate {
            filename: filename.to_string(),
            path: sidecar_path,
            staged: StagedRecords::Patch { records },
        };
        Ok((transfer.read, update))
    }

    /// Copy all of a new file to `out` and create its sidecar
    ///
    /// Same as [`stage_full`](Self::stage_full) followed by
    /// [`SidecarUpdate::apply`]. Returns the number of bytes transferred.
    pub fn write_full<W: Write + ?Sized>(&self, file: &FileInfo, out: &mut W) -> Result<u64> {
        let (bytes, update) = self.stage_full(file, out)?;
        update.apply()?;
        Ok(bytes)
    }

    /// Copy all of a new file to `out`, staging a fresh sidecar
    ///
    /// Every full page must verify (never-logged pages are accepted) and gets
    /// a record at its position. A trailing partial page is copied as is with
    /// no record.
    pub fn stage_full<W: Write + ?Sized>(
        &self,
        file: &FileInfo,
        out: &mut W,
    ) -> Result<(u64, SidecarUpdate)> {
        let filename = file.filename();
        let pagesize = file.page_size_or(self.default_page_size);

        let mut data = self.open_live(file)?;
        let file_size = data
            .metadata()
            .map_err(|e| IncrError::serialise(filename, format!("cannot stat file: {}", e)))?
            .len();

        let mut page = PageBuffer::new(pagesize, self.alignment)?;
        let mut transfer = Transfer::default();
        let mut records = Vec::with_capacity((file_size / pagesize as u64) as usize);
        let mut bytes_left = file_size;
        let mut index: u32 = 0;

        while bytes_left > 0 {
            let want = bytes_left.min(pagesize as u64) as usize;
            let read_error = || {
                IncrError::serialise(
                    filename,
                    format!("read error after {} bytes", file_size - bytes_left),
                )
            };
            let got = read_full(&mut data, page.as_mut_slice()).map_err(|_| read_error())?;
            if got < want {
                return Err(read_error());
            }

            if want == pagesize {
                let options = VerifyOptions {
                    first_page: index == 0,
                    zero_lsn_ok: true,
                };
                let (record, verdict) =
                    PageRecord::capture(page.as_slice(), pagesize, &self.verifier, options)?;
                if !verdict.valid {
                    return Err(IncrError::serialise(
                        filename,
                        format!("page {} failed checksum verification", index),
                    ));
                }
                records.push(record);
            } else {
                debug!(file = filename, bytes = want, "copying trailing partial page without record");
            }

            let written = Self::emit(filename, out, &page.as_slice()[..want])?;
            transfer.add(filename, want, written)?;

            bytes_left -= want as u64;
            index += 1;
        }

        debug!(file = filename, pages = index, bytes = transfer.written, "wrote new file");
        let update = SidecarUpdate {
            filename: filename.to_string(),
            path: file.sidecar_path(&self.incr_dir),
            staged: StagedRecords::Replace { records },
        };
        Ok((transfer.written, update))
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn open_live(&self, file: &FileInfo) -> Result<File> {
        let data = open_data_file(file.filepath(), self.direct_io).map_err(|e| {
            IncrError::serialise(file.filename(), format!("cannot open file: {}", e))
        })?;
        data.metadata().map_err(|e| {
            IncrError::serialise(file.filename(), format!("cannot stat file: {}", e))
        })?;
        Ok(data)
    }

    /// Write one chunk to the backup output; a short write is fatal
    fn emit<W: Write + ?Sized>(filename: &str, out: &mut W, chunk: &[u8]) -> Result<usize> {
        let written = write_full(out, chunk).map_err(|e| {
            IncrError::serialise(filename, format!("error writing page data: {}", e))
        })?;
        if written != chunk.len() {
            return Err(IncrError::serialise(
                filename,
                format!(
                    "error writing page data: wrote {} of {} bytes",
                    written,
                    chunk.len()
                ),
            ));
        }
        Ok(written)
    }
}

/// Open a sidecar that must already exist for in-place updates
fn open_existing(filename: &str, path: &Path) -> Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| {
            IncrError::serialise(
                filename,
                format!("cannot open incr file {}: {}", path.display(), e),
            )
        })
}
