use std::{io, marker::PhantomData, ptr::NonNull};

use log::{debug, trace, warn};

use crate::{
    Allocator, Header, HeapValue, ObjectType, ObjectView, ObjectViewMut,
    RuntimeError, Value, map_memory, page_align, tag_object, unmap_memory,
};

pub const OBJECT_ALIGN: usize = 8;

/// `None` if rounding up overflows.
#[inline]
pub const fn align_object(size: usize) -> Option<usize> {
    size.checked_next_multiple_of(OBJECT_ALIGN)
}

#[derive(Debug, Copy, Clone)]
pub struct HeapCreateInfo {
    /// Bytes to reserve, rounded up to whole pages.
    pub size: usize,
}

impl Default for HeapCreateInfo {
    fn default() -> Self {
        Self { size: 1024 * 1024 }
    }
}

/// A single bump-allocated region.
///
/// Objects are laid out back to back, each rounded to [`OBJECT_ALIGN`], so
/// the heap can be walked from the start using each object's size. Memory is
/// never reused: when the region is full, allocation fails with
/// `HeapExhausted`.
pub struct Heap {
    start: NonNull<u8>,
    size: usize,
    top: usize,
}

impl Heap {
    pub fn new(info: HeapCreateInfo) -> Self {
        Self::try_new(info).expect("Allocate Memory for heap")
    }

    pub fn try_new(info: HeapCreateInfo) -> io::Result<Self> {
        let size = page_align(info.size.max(1));
        let start = map_memory(size).ok_or_else(io::Error::last_os_error)?;
        debug!("mapped heap of {size} bytes at {:p}", start.as_ptr());
        Ok(Self {
            start,
            size,
            top: 0,
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn used(&self) -> usize {
        self.top
    }

    #[inline]
    pub fn free(&self) -> usize {
        self.size - self.top
    }

    #[inline]
    pub fn contains(&self, ptr: *const u8) -> bool {
        let start = self.start.as_ptr() as usize;
        (start..start + self.top).contains(&(ptr as usize))
    }

    /// The allocated part of the heap.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: [start, start + top) is mapped and initialized
        unsafe { std::slice::from_raw_parts(self.start.as_ptr(), self.top) }
    }

    /// Replace the contents with `bytes` taken from another heap's
    /// [`Heap::as_bytes`]. Nothing inside is relocated.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), RuntimeError> {
        if bytes.len() > self.size {
            return Err(RuntimeError::HeapExhausted {
                requested: bytes.len(),
            });
        }
        // SAFETY: fits, checked above
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.start.as_ptr(),
                bytes.len(),
            );
            std::ptr::write_bytes(
                self.start.as_ptr().add(bytes.len()),
                0,
                self.top.saturating_sub(bytes.len()),
            );
        }
        self.top = bytes.len();
        Ok(())
    }

    /// Offset of the object `value` references, if it starts an object in
    /// this heap.
    pub fn offset_of(&self, value: Value) -> Option<usize> {
        if !value.is_object() {
            return None;
        }
        let ptr = crate::untag(value);
        if !self.contains(ptr) {
            return None;
        }
        let offset = ptr as usize - self.start.as_ptr() as usize;
        self.objects()
            .any(|object| object.as_ptr().cast::<u8>() == ptr)
            .then_some(offset)
    }

    /// Value for the object starting at `offset`.
    pub fn value_at(&self, offset: usize) -> Option<Value> {
        self.objects()
            .find(|object| {
                object.as_ptr() as usize - self.start.as_ptr() as usize
                    == offset
            })
            .map(|object| tag_object(object.as_ptr()))
    }

    pub fn objects(&self) -> Objects<'_> {
        Objects {
            heap: self,
            offset: 0,
            corrupt: false,
            _marker: PhantomData,
        }
    }

    /// The objects tile the allocated bytes exactly, none is corrupt and
    /// none runs past the end.
    pub fn is_walkable(&self) -> bool {
        let mut objects = self.objects();
        objects.by_ref().for_each(drop);
        !objects.corrupt && objects.offset == self.top
    }

    /// Expire every handle in the heap. Returns how many were still live.
    pub fn expire_handles(&mut self) -> usize {
        let mut expired = 0;
        for mut object in self.objects() {
            // SAFETY: objects are not aliased during the sweep
            let object = unsafe { object.as_mut() };
            if let Some(ObjectViewMut::Handle(handle)) = object.view_mut() {
                if !handle.is_expired() {
                    expired += 1;
                }
                handle.expire();
            }
        }
        debug!("expired {expired} handles");
        expired
    }

    /// Handles that still name an object.
    pub fn live_handles(&self) -> usize {
        self.objects()
            .filter(|object| {
                // SAFETY: walking initialized objects
                let object = unsafe { object.as_ref() };
                matches!(
                    object.view(),
                    Some(ObjectView::Handle(h)) if !h.is_expired()
                )
            })
            .count()
    }
}

impl Allocator for Heap {
    fn allot_object(
        &mut self,
        ty: ObjectType,
        size: usize,
    ) -> Result<NonNull<u8>, RuntimeError> {
        debug_assert!(size >= size_of::<Header>());
        let size = align_object(size).unwrap_or(usize::MAX);
        if size > self.free() {
            warn!(
                "heap exhausted: {size} bytes requested, {} free",
                self.free()
            );
            return Err(RuntimeError::HeapExhausted { requested: size });
        }

        // SAFETY: top + size <= self.size
        let ptr = unsafe { self.start.add(self.top) };
        self.top += size;
        // SAFETY: fresh, in bounds, aligned
        unsafe {
            std::ptr::write_bytes(ptr.as_ptr(), 0, size);
            ptr.cast::<Header>().write(Header::new(ty));
        }
        trace!("allot {ty:?} {size} bytes at {:p}", ptr.as_ptr());
        Ok(ptr)
    }
}

impl Drop for Heap {
    fn drop(&mut self) {
        // SAFETY: mapped in try_new with this size
        unsafe { unmap_memory(self.start, self.size) };
    }
}

impl std::fmt::Debug for Heap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heap")
            .field("start", &self.start)
            .field("size", &self.size)
            .field("used", &self.top)
            .finish()
    }
}

/// Walks the heap in allocation order. Stops at the first object that is
/// corrupt or does not fit below the top.
pub struct Objects<'a> {
    heap: &'a Heap,
    offset: usize,
    corrupt: bool,
    _marker: PhantomData<&'a HeapValue>,
}

impl Objects<'_> {
    /// Aligned size of `object` if all of it lies in `remaining` bytes.
    fn extent(object: NonNull<HeapValue>, remaining: usize) -> Option<usize> {
        if remaining < size_of::<Header>() {
            return None;
        }
        // SAFETY: the header is in bounds
        let fixed = unsafe { object.as_ref() }.fixed_size()?;
        if fixed > remaining {
            return None;
        }
        // SAFETY: the fixed fields are in bounds
        let size = unsafe { object.as_ref() }.heap_size()?;
        align_object(size).filter(|&size| size <= remaining)
    }
}

impl Iterator for Objects<'_> {
    type Item = NonNull<HeapValue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.corrupt || self.offset >= self.heap.top {
            return None;
        }
        // SAFETY: offset < top
        let ptr =
            unsafe { self.heap.start.add(self.offset) }.cast::<HeapValue>();
        let Some(size) = Self::extent(ptr, self.heap.top - self.offset) else {
            warn!("corrupt object at heap offset {}", self.offset);
            self.corrupt = true;
            return None;
        };
        self.offset += size;
        Some(ptr)
    }
}
