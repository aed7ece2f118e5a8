//! Aligned page buffer
//!
//! Page reads and writes may go through O_DIRECT, which requires the user
//! buffer to start on a sector boundary. The allocation is released in `Drop`,
//! so every exit path (including `?` on an error) frees it.

use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

use crate::error::{IncrError, Result};

/// Heap allocation of one page with a guaranteed alignment
pub struct PageBuffer {
    ptr: NonNull<u8>,
    len: usize,
    layout: Layout,
}

// The buffer uniquely owns its allocation, so it may move between threads.
unsafe impl Send for PageBuffer {}

impl PageBuffer {
    /// Allocate a zeroed buffer of `len` bytes aligned to `alignment`
    pub fn new(len: usize, alignment: usize) -> Result<Self> {
        if len == 0 {
            return Err(IncrError::InvalidPage("zero-length page buffer".into()));
        }
        let layout = Layout::from_size_align(len, alignment).map_err(|_| {
            IncrError::Config(format!(
                "invalid page buffer layout: {} bytes aligned to {}",
                len, alignment
            ))
        })?;

        // Safety: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw).ok_or_else(|| {
            IncrError::Io(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "failed to allocate aligned page buffer",
            ))
        })?;

        Ok(Self { ptr, len, layout })
    }

    /// Alignment guaranteed by this allocation
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        // Safety: ptr is valid for len initialized (zeroed) bytes.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // Safety: ptr is valid for len bytes and uniquely borrowed.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl std::fmt::Debug for PageBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageBuffer")
            .field("len", &self.len)
            .field("alignment", &self.alignment())
            .finish()
    }
}

impl Drop for PageBuffer {
    fn drop(&mut self) {
        // Safety: allocated in `new` with this exact layout.
        unsafe {
            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}
