//! Tar block writer
//!
//! Emits ustar entries and makes sure every payload matches its header.

use std::io::{self, Write};

use crate::error::{IncrError, Result};

use super::header::{TarHeader, BLOCK_SIZE};

const ZERO_BLOCK: [u8; BLOCK_SIZE] = [0u8; BLOCK_SIZE];

/// The entry currently being written
#[derive(Debug)]
struct OpenEntry {
    name: String,
    declared: u64,
    written: u64,
}

/// Block-aligned writer of a tar stream
///
/// Usage: [`begin_entry`](Self::begin_entry), write the payload through the
/// `Write` impl, [`finish_entry`](Self::finish_entry); repeat, then
/// [`finish`](Self::finish).
pub struct TarBlockWriter<W: Write> {
    inner: W,
    /// Bytes handed to `inner` so far
    position: u64,
    entry: Option<OpenEntry>,
}

impl<W: Write> TarBlockWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            position: 0,
            entry: None,
        }
    }

    /// Bytes written to the transport so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Write `header` and open its entry for payload
    pub fn begin_entry(&mut self, header: &TarHeader) -> Result<()> {
        if let Some(open) = &self.entry {
            return Err(IncrError::MalformedBlock(format!(
                "entry {} is still open",
                open.name
            )));
        }
        let block = header.to_block()?;
        self.put(&block)?;
        self.entry = Some(OpenEntry {
            name: header.name().to_string(),
            declared: header.size(),
            written: 0,
        });
        Ok(())
    }

    /// Close the open entry, padding it to a block boundary
    ///
    /// Fails when the payload written differs from the size in the header;
    /// the stream cannot be repaired afterwards. Returns the payload length.
    pub fn finish_entry(&mut self) -> Result<u64> {
        let open = self
            .entry
            .take()
            .ok_or_else(|| IncrError::MalformedBlock("no entry is open".into()))?;
        if open.written != open.declared {
            return Err(IncrError::serialise(
                open.name,
                format!(
                    "size changed during backup: declared {} bytes, wrote {}",
                    open.declared, open.written
                ),
            ));
        }
        let padding = (BLOCK_SIZE - (open.written % BLOCK_SIZE as u64) as usize) % BLOCK_SIZE;
        self.put(&ZERO_BLOCK[..padding])?;
        Ok(open.written)
    }

    /// Write a whole in-memory entry
    pub fn append(&mut self, name: &str, payload: &[u8], mtime: u64) -> Result<()> {
        let header = TarHeader::new(name, payload.len() as u64).with_mtime(mtime);
        self.begin_entry(&header)?;
        self.write_all(payload)?;
        self.finish_entry()?;
        Ok(())
    }

    /// Terminate the archive with two zero blocks and hand back the sink
    pub fn finish(mut self) -> Result<W> {
        if let Some(open) = &self.entry {
            return Err(IncrError::MalformedBlock(format!(
                "entry {} is still open",
                open.name
            )));
        }
        self.put(&ZERO_BLOCK)?;
        self.put(&ZERO_BLOCK)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.position += bytes.len() as u64;
        Ok(())
    }
}

impl<W: Write> Write for TarBlockWriter<W> {
    /// Payload bytes for the open entry; never more than it declared
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let open = self
            .entry
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no entry is open"))?;
        let room = open.declared - open.written;
        if buf.len() as u64 > room {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "entry {} overflows its declared {} bytes",
                    open.name, open.declared
                ),
            ));
        }
        let n = self.inner.write(buf)?;
        open.written += n as u64;
        self.position += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
