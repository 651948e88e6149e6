//! Graphics-buffer locking bridge.
//!
//! The framework hands the HAL opaque buffer handles; before V4L2 can fill
//! one with `V4L2_MEMORY_USERPTR` it must be locked into addressable memory.
//! The bridge owns that lock state and is commanded by the wrapper: lock on
//! enqueue, unlock on dequeue, unlock-all on every stream transition
//! (stream-off and REQBUFS both return queued buffers to the user).

use std::collections::HashMap;

use iris_core::prelude::{Error, Result};

/// Opaque framework buffer handle.
pub type BufferHandle = u64;

/// A locked buffer mapped for CPU writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockedBuffer {
    /// Userspace address V4L2 will write through.
    pub userptr: u64,
    /// Mapped length in bytes.
    pub length: u32,
}

/// Lock/unlock surface of the graphics allocator.
pub trait Gralloc: Send {
    /// Lock `handle` for writing `length` bytes with the given stride.
    fn lock(&mut self, handle: BufferHandle, bytes_per_line: u32, length: u32)
    -> Result<LockedBuffer>;

    /// Unlock a previously locked handle.
    fn unlock(&mut self, handle: BufferHandle) -> Result<()>;

    /// Unlock every handle this bridge still holds.
    fn unlock_all(&mut self) -> Result<()>;

    /// Number of handles currently locked.
    fn locked_count(&self) -> usize;
}

/// Heap-backed bridge: each lock pins an owned allocation until unlock.
///
/// Stands in for a hardware gralloc on plain Linux; the allocation is the
/// addressable memory the framework buffer maps to.
#[derive(Default)]
pub struct HeapGralloc {
    locked: HashMap<BufferHandle, Box<[u8]>>,
}

impl HeapGralloc {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Gralloc for HeapGralloc {
    fn lock(
        &mut self,
        handle: BufferHandle,
        _bytes_per_line: u32,
        length: u32,
    ) -> Result<LockedBuffer> {
        if self.locked.contains_key(&handle) {
            return Err(Error::InvalidArgument(format!(
                "buffer {handle} is already locked"
            )));
        }
        if length == 0 {
            return Err(Error::InvalidArgument(format!(
                "buffer {handle} locked with zero length"
            )));
        }
        let storage = vec![0u8; length as usize].into_boxed_slice();
        let userptr = storage.as_ptr() as u64;
        self.locked.insert(handle, storage);
        Ok(LockedBuffer { userptr, length })
    }

    fn unlock(&mut self, handle: BufferHandle) -> Result<()> {
        self.locked
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| Error::InvalidArgument(format!("buffer {handle} is not locked")))
    }

    fn unlock_all(&mut self) -> Result<()> {
        self.locked.clear();
        Ok(())
    }

    fn locked_count(&self) -> usize {
        self.locked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_then_unlock_releases_the_handle() {
        let mut gralloc = HeapGralloc::new();
        let locked = gralloc.lock(7, 640, 640 * 480).unwrap();
        assert_ne!(locked.userptr, 0);
        assert_eq!(gralloc.locked_count(), 1);
        gralloc.unlock(7).unwrap();
        assert_eq!(gralloc.locked_count(), 0);
    }

    #[test]
    fn double_lock_is_rejected() {
        let mut gralloc = HeapGralloc::new();
        gralloc.lock(7, 0, 16).unwrap();
        assert!(gralloc.lock(7, 0, 16).is_err());
    }

    #[test]
    fn unlock_all_clears_every_lock() {
        let mut gralloc = HeapGralloc::new();
        gralloc.lock(1, 0, 16).unwrap();
        gralloc.lock(2, 0, 16).unwrap();
        gralloc.unlock_all().unwrap();
        assert_eq!(gralloc.locked_count(), 0);
        assert!(gralloc.unlock(1).is_err());
    }
}
