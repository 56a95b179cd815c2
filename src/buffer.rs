use std::alloc;
use std::alloc::Layout;
use std::ptr::NonNull;

use crate::error::{ArrayError, ErrorKind};

/// An owned, aligned byte allocation backing one array.
///
/// *Don't use this type directly — arrays hand out element pointers.*
// Like a Vec<u8> with a caller-chosen alignment and no length/capacity
// distinction; arrays track their own element counts.
#[derive(Debug)]
pub(crate) struct RawBuffer {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
}

impl RawBuffer {
    /// Allocate `len` bytes aligned to `align`.
    ///
    /// `len` must be nonzero; allocation paths guarantee at least one
    /// element's worth of storage.
    pub(crate) fn allocate(len: usize, align: usize, zeroed: bool) -> Result<RawBuffer, ArrayError> {
        debug_assert!(len > 0);
        let layout = Layout::from_size_align(len, align)
            .map_err(|_| ArrayError::new(ErrorKind::OutOfMemory, "cannot allocate array memory"))?;
        let raw = unsafe {
            if zeroed {
                alloc::alloc_zeroed(layout)
            } else {
                alloc::alloc(layout)
            }
        };
        match NonNull::new(raw) {
            Some(ptr) => Ok(RawBuffer { ptr, len, align }),
            None => Err(ArrayError::new(
                ErrorKind::OutOfMemory,
                "cannot allocate array memory",
            )),
        }
    }

    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub(crate) fn as_nonnull(&self) -> NonNull<u8> {
        self.ptr
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Grow or shrink the allocation to `new_len` bytes; returns the new
    /// base pointer.
    ///
    /// ## Safety
    ///
    /// Existing pointers into the data are invalidated.
    #[must_use = "must use new pointer to update existing pointers"]
    pub(crate) fn resize(&mut self, new_len: usize) -> Result<NonNull<u8>, ArrayError> {
        debug_assert!(new_len > 0);
        let layout = Layout::from_size_align(self.len, self.align)
            .map_err(|_| ArrayError::new(ErrorKind::OutOfMemory, "cannot allocate array memory"))?;
        let raw = unsafe { alloc::realloc(self.ptr.as_ptr(), layout, new_len) };
        match NonNull::new(raw) {
            Some(ptr) => {
                self.ptr = ptr;
                self.len = new_len;
                Ok(ptr)
            }
            None => Err(ArrayError::new(
                ErrorKind::OutOfMemory,
                "cannot allocate array memory",
            )),
        }
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        // the layout was valid at allocation time, so it is valid here
        if let Ok(layout) = Layout::from_size_align(self.len, self.align) {
            unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) }
        }
    }
}
