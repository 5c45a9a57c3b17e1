use core::{
    alloc::Layout,
    fmt::Debug,
    marker::PhantomData,
    mem::{ManuallyDrop, size_of},
    ops::{Deref, DerefMut},
    ptr::NonNull,
};

use alloc::alloc::{alloc_zeroed, dealloc, handle_alloc_error};

/// Base address alignment of every [`AlignedBuffer`], enough for a 512-bit vector load.
pub const BUFFER_ALIGNMENT: usize = 64;

mod sealing {
    pub trait Sealed {}
}

/// Plain element types that are valid when all of their bits are zero.
pub trait ZeroablePod: Copy + sealing::Sealed {}

macro_rules! zeroable_pod {
    ($($ty:ty),+) => {
        $(
            impl sealing::Sealed for $ty {}
            impl ZeroablePod for $ty {}
        )+
    };
}

zeroable_pod!(u8, f32);

/// The allocator could not provide the requested storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("failed to allocate {bytes} bytes")]
pub struct AllocationError {
    /// The requested size in bytes, `usize::MAX` if the size computation itself overflowed.
    pub bytes: usize,
}

/// A zero-initialized heap slice whose base address is aligned to [`BUFFER_ALIGNMENT`] bytes.
///
/// Storage is obtained from the global allocator and returned to it on drop.
pub struct AlignedBuffer<T: ZeroablePod> {
    ptr: NonNull<T>,
    len: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer uniquely owns its allocation.
unsafe impl<T: ZeroablePod + Send> Send for AlignedBuffer<T> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: ZeroablePod + Sync> Sync for AlignedBuffer<T> {}

impl<T: ZeroablePod> AlignedBuffer<T> {
    fn layout(len: usize) -> Result<Layout, AllocationError> {
        let bytes = len
            .checked_mul(size_of::<T>())
            .ok_or(AllocationError { bytes: usize::MAX })?;

        Layout::from_size_align(bytes, BUFFER_ALIGNMENT).map_err(|_| AllocationError { bytes })
    }

    /// Allocate `len` zeroed elements.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the size overflows or the allocator refuses the request.
    pub fn zeroed(len: usize) -> Result<Self, AllocationError> {
        let layout = Self::layout(len)?;

        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len: 0,
                _marker: PhantomData,
            });
        }

        // SAFETY: the layout has a non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<T>()).ok_or(AllocationError {
            bytes: layout.size(),
        })?;

        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocate a copy of this buffer.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the allocator refuses the request.
    pub fn try_clone(&self) -> Result<Self, AllocationError> {
        let mut out = Self::zeroed(self.len)?;
        out.copy_from_slice(self);
        Ok(out)
    }

    /// Give up ownership of the storage.
    ///
    /// The storage must eventually be handed back to [`AlignedBuffer::from_raw_parts`] exactly once, otherwise it leaks.
    #[must_use]
    pub fn into_raw_parts(self) -> (NonNull<T>, usize) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.len)
    }

    /// Take back ownership of storage released by [`AlignedBuffer::into_raw_parts`].
    ///
    /// # Safety
    ///
    /// `ptr` and `len` must come from a single call to [`AlignedBuffer::into_raw_parts`] on an `AlignedBuffer<T>`,
    /// and the storage must not be owned by any other buffer.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` is not aligned to [`BUFFER_ALIGNMENT`] bytes while `len` is non-zero.
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize) -> Self {
        if len != 0 {
            assert_eq!(
                ptr.as_ptr().align_offset(BUFFER_ALIGNMENT),
                0,
                "pointer is not aligned to 64 bytes"
            );
        }

        Self {
            ptr,
            len,
            _marker: PhantomData,
        }
    }
}

impl<T: ZeroablePod> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        let size = self.len * size_of::<T>();
        if size == 0 {
            return;
        }

        // SAFETY: the same layout was validated when the storage was allocated.
        unsafe {
            dealloc(
                self.ptr.as_ptr().cast::<u8>(),
                Layout::from_size_align_unchecked(size, BUFFER_ALIGNMENT),
            );
        }
    }
}

impl<T: ZeroablePod> Clone for AlignedBuffer<T> {
    fn clone(&self) -> Self {
        self.try_clone().unwrap_or_else(|_| {
            // SAFETY: the same layout was validated when `self` was allocated.
            handle_alloc_error(unsafe {
                Layout::from_size_align_unchecked(self.len * size_of::<T>(), BUFFER_ALIGNMENT)
            })
        })
    }
}

impl<T: ZeroablePod> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        // SAFETY: `ptr` is valid for `len` initialized elements, or dangling and aligned with `len == 0`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: ZeroablePod> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: ZeroablePod + PartialEq> PartialEq for AlignedBuffer<T> {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

impl<T: ZeroablePod> Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aligned_zeroed() {
        for len in [1, 3, 8, 17, 1000, 4096 + 5] {
            let buf = AlignedBuffer::<f32>::zeroed(len).unwrap();
            assert_eq!(buf.len(), len);
            assert_eq!(buf.as_ptr().align_offset(BUFFER_ALIGNMENT), 0);
            assert!(buf.iter().all(|v| *v == 0.0));
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buf = AlignedBuffer::<u8>::zeroed(0).unwrap();
        assert!(buf.is_empty());
        assert_eq!(&*buf, &[] as &[u8]);
        let clone = buf.clone();
        assert!(clone.is_empty());
    }

    #[test]
    fn test_size_overflow() {
        assert_eq!(
            AlignedBuffer::<f32>::zeroed(usize::MAX).unwrap_err(),
            AllocationError { bytes: usize::MAX }
        );

        // fits in usize but not in a valid layout
        let len = usize::MAX / 4;
        let err = AlignedBuffer::<f32>::zeroed(len).unwrap_err();
        assert_eq!(err.bytes, len * 4);
    }

    #[test]
    fn test_clone_and_raw_parts() {
        let mut buf = AlignedBuffer::<f32>::zeroed(37).unwrap();
        buf.iter_mut()
            .enumerate()
            .for_each(|(i, v)| *v = i as f32 * 0.5);

        let clone = buf.try_clone().unwrap();
        assert_eq!(clone, buf);
        assert_ne!(clone.as_ptr(), buf.as_ptr());

        let (ptr, len) = buf.into_raw_parts();
        let restored = unsafe { AlignedBuffer::from_raw_parts(ptr, len) };
        assert_eq!(restored, clone);
    }
}
