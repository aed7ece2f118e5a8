//! Tar block reader
//!
//! Pulls 512-byte blocks off a transport and never reads past the end of the
//! entry it is positioned in.

use std::io::{self, Read};

use tracing::trace;

use crate::error::{IncrError, Result};
use crate::io::read_full;

use super::header::{is_zero_block, TarHeader, BLOCK_SIZE};

/// Most bytes `read_payload` reserves before any payload has arrived
const PAYLOAD_PREALLOC_LIMIT: u64 = 64 * 1024;

/// Block-aligned reader over a tar stream
pub struct TarBlockReader<R> {
    inner: R,
    /// Bytes consumed from `inner` so far
    position: u64,
}

impl<R: Read> TarBlockReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes consumed from the transport so far
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Read one whole block
    ///
    /// Returns false on a clean end of input (nothing read). A partial block
    /// means the transport was cut mid-block and is fatal.
    pub fn read_block(&mut self, block: &mut [u8; BLOCK_SIZE]) -> Result<bool> {
        let got = read_full(&mut self.inner, block)?;
        self.position += got as u64;
        match got {
            0 => Ok(false),
            BLOCK_SIZE => Ok(true),
            n => Err(IncrError::MalformedBlock(format!(
                "short block: got {} of {} bytes",
                n, BLOCK_SIZE
            ))),
        }
    }

    /// Advance to the next entry header
    ///
    /// All-zero blocks are filler and skipped. Returns `None` only when the
    /// transport is exhausted. A header that fails to parse is the last thing
    /// consumed.
    pub fn next_header(&mut self, verify_checksum: bool) -> Result<Option<TarHeader>> {
        let mut block = [0u8; BLOCK_SIZE];
        loop {
            if !self.read_block(&mut block)? {
                return Ok(None);
            }
            if is_zero_block(&block) {
                trace!(position = self.position, "skipping zero block");
                continue;
            }
            return TarHeader::parse(&block, verify_checksum).map(Some);
        }
    }

    /// Bounded reader over the payload of `header`
    ///
    /// Call [`EntryReader::finish`] afterwards to skip whatever the consumer
    /// left unread plus the block padding.
    pub fn entry(&mut self, header: &TarHeader) -> EntryReader<'_, R> {
        EntryReader {
            reader: self,
            remaining: header.size(),
            padding: header.padding(),
        }
    }

    /// Read a whole payload into memory and skip its padding
    ///
    /// The buffer grows with the bytes that actually arrive, so a size field
    /// larger than the stream fails as a truncated entry instead of being
    /// allocated up front.
    pub fn read_payload(&mut self, header: &TarHeader) -> Result<Vec<u8>> {
        let len = header.size();
        let capacity = usize::try_from(len.min(PAYLOAD_PREALLOC_LIMIT)).unwrap_or(0);
        let mut payload = Vec::with_capacity(capacity);
        let mut entry = self.entry(header);
        let got = entry.read_to_end(&mut payload)? as u64;
        if got != len {
            return Err(IncrError::MalformedBlock(format!(
                "{}: stream ended after {} of {} payload bytes",
                header.name(),
                got,
                len
            )));
        }
        entry.finish()?;
        Ok(payload)
    }
}

/// Payload of one entry; reads stop at the declared size
pub struct EntryReader<'a, R> {
    reader: &'a mut TarBlockReader<R>,
    remaining: u64,
    padding: u64,
}

impl<R: Read> EntryReader<'_, R> {
    /// Payload bytes not read yet
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Skip the unread payload and the padding up to the next block boundary
    ///
    /// Returns the number of payload bytes that were skipped.
    pub fn finish(mut self) -> Result<u64> {
        let unread = self.remaining;
        let skip = unread + self.padding;
        let skipped = io::copy(&mut (&mut self.reader.inner).take(skip), &mut io::sink())?;
        self.reader.position += skipped;
        self.remaining = 0;
        if skipped != skip {
            return Err(IncrError::MalformedBlock(format!(
                "stream ended inside an entry: {} bytes missing",
                skip - skipped
            )));
        }
        Ok(unread)
    }
}

impl<R: Read> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = buf.len().min(usize::try_from(self.remaining).unwrap_or(usize::MAX));
        let n = self.reader.inner.read(&mut buf[..max])?;
        self.remaining -= n as u64;
        self.reader.position += n as u64;
        Ok(n)
    }
}
