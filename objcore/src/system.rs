use std::ptr::NonNull;

pub const OS_PAGE_SIZE: usize = 4096;

#[cfg(unix)]
mod unix {
    /// posix memory allocation using mmap
    /// # Safety
    /// null must be checked
    #[inline]
    pub unsafe fn anonymous_mmap(len: usize) -> *mut u8 {
        // SAFETY: anonymous private mapping, no fd involved
        let p = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if p == libc::MAP_FAILED {
            core::ptr::null_mut()
        } else {
            p.cast()
        }
    }

    /// posix memory deallocation using munmap
    /// # Safety
    /// must be allocated by mmap with the same length
    #[inline]
    pub unsafe fn anonymous_munmap(ptr: *mut u8, len: usize) {
        // SAFETY: safe if contract holds
        let _ = unsafe { libc::munmap(ptr.cast(), len) };
    }
}

/// Round `size` up to a whole number of OS pages.
#[inline]
pub fn page_align(size: usize) -> usize {
    size.next_multiple_of(OS_PAGE_SIZE)
}

/// Map `size` bytes of zeroed, read-write memory. `size` must be page aligned.
#[must_use]
pub fn map_memory(size: usize) -> Option<NonNull<u8>> {
    debug_assert!(size.is_multiple_of(OS_PAGE_SIZE));
    // SAFETY: null is checked by NonNull::new
    let ptr = unsafe { unix::anonymous_mmap(size) };
    NonNull::new(ptr)
}

/// # Safety
/// `ptr` and `size` must come from a single [`map_memory`] call
pub unsafe fn unmap_memory(ptr: NonNull<u8>, size: usize) {
    // SAFETY: by contract
    unsafe { unix::anonymous_munmap(ptr.as_ptr(), size) };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_memory_is_zeroed_and_writable() {
        let size = page_align(10_000);
        assert_eq!(size, 3 * OS_PAGE_SIZE);
        let ptr = map_memory(size).expect("mmap");
        // SAFETY: freshly mapped region of `size` bytes
        unsafe {
            let bytes = std::slice::from_raw_parts_mut(ptr.as_ptr(), size);
            assert!(bytes.iter().all(|&b| b == 0));
            bytes[size - 1] = 0xAB;
            assert_eq!(bytes[size - 1], 0xAB);
            unmap_memory(ptr, size);
        }
    }
}
